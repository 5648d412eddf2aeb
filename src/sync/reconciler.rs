// src/sync/reconciler.rs
//! Batch reconciliation between local users and remote identity-provider users.
//!
//! Work is applied row by row. A failure on one user is recorded in the report
//! and does not undo mappings created before it.

use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{info, warn};

use super::models::{
    ImportReport, MappingStatus, SyncError, SyncReport, UnmappedUser, ERROR_MESSAGE_LEN,
    MAX_REPORTED_ERRORS,
};
use crate::common::{safe_email_log, truncate_chars};
use crate::identity::repository;
use crate::services::{IdentityProvider, RemoteUser, SupabaseError};

fn push_error(errors: &mut Vec<String>, email: &str, message: &str) {
    if errors.len() < MAX_REPORTED_ERRORS {
        errors.push(format!(
            "{}: {}",
            email,
            truncate_chars(message, ERROR_MESSAGE_LEN)
        ));
    }
}

/// Lowercased email -> remote id. Later entries win on duplicate emails.
fn index_by_email(users: &[RemoteUser]) -> HashMap<String, String> {
    users
        .iter()
        .filter_map(|u| {
            u.email
                .as_deref()
                .map(|e| (e.to_lowercase(), u.id.clone()))
        })
        .collect()
}

/// Create mappings for every unmapped local user whose email exists remotely
pub async fn reconcile_mappings(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
) -> Result<SyncReport, SyncError> {
    if !provider.is_configured() {
        return Err(SupabaseError::NotConfigured.into());
    }

    let unmapped = repository::list_unmapped_users(pool).await?;
    let total_users = repository::count_users(pool).await?;
    let already_mapped = repository::count_mappings(pool).await?;

    info!(
        total_users,
        already_mapped,
        need_mapping = unmapped.len(),
        "Starting mapping sync"
    );

    if unmapped.is_empty() {
        return Ok(SyncReport {
            success: true,
            message: "All users already mapped".to_string(),
            total_users,
            already_mapped,
            created: 0,
            not_found: 0,
            failed: 0,
            errors: Vec::new(),
            final_mapped: already_mapped,
            remaining: total_users - already_mapped,
        });
    }

    let remote_users = provider.list_users().await?;
    let remote_by_email = index_by_email(&remote_users);
    info!(remote_users = remote_by_email.len(), "Fetched remote users");

    let total = unmapped.len();
    let mut created = 0;
    let mut not_found = 0;
    let mut failed = 0;
    let mut errors = Vec::new();

    for (i, user) in unmapped.iter().enumerate() {
        let position = i + 1;
        let show_progress = position <= 5 || position % 10 == 0 || position + 5 > total;
        let email = user.email.to_lowercase();

        match remote_by_email.get(&email) {
            Some(remote_id) => {
                match repository::create_mapping(pool, &user.id, remote_id, &email).await {
                    Ok(_) => {
                        created += 1;
                        if show_progress {
                            info!(position, total, email = %safe_email_log(&email), "Created mapping");
                        }
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(position, total, email = %safe_email_log(&email), error = %e, "Mapping failed");
                        push_error(&mut errors, &email, &e.to_string());
                    }
                }
            }
            None => {
                not_found += 1;
                if show_progress {
                    info!(position, total, email = %safe_email_log(&email), "Not found in Supabase");
                }
            }
        }
    }

    let final_mapped = repository::count_mappings(pool).await?;
    info!(created, not_found, failed, final_mapped, "Mapping sync completed");

    Ok(SyncReport {
        success: true,
        message: "Sync completed".to_string(),
        total_users,
        already_mapped,
        created,
        not_found,
        failed,
        errors,
        final_mapped,
        remaining: total_users - final_mapped,
    })
}

/// Bring every remote user with an email into the local store and map it
pub async fn import_remote_users(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
) -> Result<ImportReport, SyncError> {
    let remote_users: Vec<RemoteUser> = provider
        .list_users()
        .await?
        .into_iter()
        .filter(|u| u.email.is_some())
        .collect();

    let mut created_users = 0;
    let mut created_mappings = 0;
    let mut skipped = 0;
    let mut failed = 0;
    let mut errors = Vec::new();

    for remote in &remote_users {
        let email = remote
            .email
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        let user = match repository::find_user_by_email(pool, &email).await? {
            Some(user) => user,
            None => {
                match repository::create_user_with_mapping(pool, Some(&email), &remote.id, &email)
                    .await
                {
                    Ok(_) => {
                        created_users += 1;
                        created_mappings += 1;
                    }
                    Err(e) => {
                        failed += 1;
                        warn!(email = %safe_email_log(&email), error = %e, "Import user failed");
                        push_error(&mut errors, &email, &e.to_string());
                    }
                }
                continue;
            }
        };

        if repository::find_mapping_for_user(pool, &user.id)
            .await?
            .is_some()
        {
            skipped += 1;
            continue;
        }

        match repository::create_mapping(pool, &user.id, &remote.id, &email).await {
            Ok(_) => created_mappings += 1,
            Err(e) => {
                failed += 1;
                warn!(email = %safe_email_log(&email), error = %e, "Import mapping failed");
                push_error(&mut errors, &email, &e.to_string());
            }
        }
    }

    let total_users = repository::count_users(pool).await?;
    let total_mappings = repository::count_mappings(pool).await?;
    info!(
        found = remote_users.len(),
        created_users, created_mappings, skipped, failed, "Remote user import completed"
    );

    Ok(ImportReport {
        success: true,
        message: "Import completed".to_string(),
        supabase_users_found: remote_users.len(),
        created_users,
        created_mappings,
        skipped,
        failed,
        errors,
        total_users,
        total_mappings,
    })
}

/// Unmapped local users plus, when the provider is reachable, remote orphans
pub async fn mapping_status(
    pool: &SqlitePool,
    provider: &dyn IdentityProvider,
) -> Result<MappingStatus, SyncError> {
    let total_users = repository::count_users(pool).await?;
    let mapped = repository::count_mappings(pool).await?;
    let unmapped_users: Vec<UnmappedUser> = repository::list_unmapped_users(pool)
        .await?
        .into_iter()
        .map(UnmappedUser::from)
        .collect();

    let mut status = MappingStatus {
        total_users,
        mapped,
        unmapped: unmapped_users.len() as i64,
        unmapped_users,
        supabase_configured: provider.is_configured(),
        supabase_users: None,
        orphaned_supabase_ids: Vec::new(),
        supabase_error: None,
    };

    if !status.supabase_configured {
        return Ok(status);
    }

    match provider.list_users().await {
        Ok(remote_users) => {
            let mapped_ids = repository::list_mapped_supabase_ids(pool).await?;
            status.supabase_users = Some(remote_users.len());
            status.orphaned_supabase_ids = remote_users
                .into_iter()
                .filter(|u| !mapped_ids.contains(&u.id))
                .map(|u| u.id)
                .collect();
        }
        Err(e) => {
            warn!(error = %e, "Could not list Supabase users for status");
            status.supabase_error = Some(e.to_string());
        }
    }

    Ok(status)
}
