//! Lazy reconciliation of a verified remote user to a local user.
//!
//! Lookup order:
//! 1. Mapping by remote id (must be active)
//! 2. Local user by email
//! 3. New local user
//!
//! Steps 2 and 3 create the mapping on the fly; step 3 inserts the user and
//! the mapping in one transaction. Every successful resolution touches the
//! mapping's `last_login_at`.

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use super::models::{LocalUser, MappingError};
use super::repository;
use crate::common::safe_email_log;
use crate::services::RemoteUser;

#[derive(Clone)]
pub struct IdentityMapper {
    pool: SqlitePool,
}

impl IdentityMapper {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn resolve(&self, remote: &RemoteUser) -> Result<LocalUser, MappingError> {
        if let Some(user) = self.mapped_user(remote).await? {
            return Ok(user);
        }

        let email = remote.email.as_deref();
        let existing = match email {
            Some(e) => repository::find_user_by_email(&self.pool, e).await?,
            None => None,
        };

        let created = match existing {
            Some(user) => {
                info!(
                    user_id = %user.id,
                    supabase_id = %remote.id,
                    "Matched remote user to local user by email"
                );
                repository::create_mapping(
                    &self.pool,
                    &user.id,
                    &remote.id,
                    email.unwrap_or_default(),
                )
                .await
                .map(|mapping| (user, mapping))
            }
            None => repository::create_user_with_mapping(
                &self.pool,
                email,
                &remote.id,
                email.unwrap_or_default(),
            )
            .await
            .map(|(user, mapping)| {
                info!(
                    user_id = %user.id,
                    supabase_id = %remote.id,
                    email = %safe_email_log(&user.email),
                    "Created local user for remote account"
                );
                (user, mapping)
            }),
        };

        let (user, mapping) = match created {
            Ok(pair) => pair,
            Err(MappingError::Duplicate(msg)) => {
                // A concurrent first login for the same remote id got there first
                warn!(supabase_id = %remote.id, reason = %msg, "Mapping created concurrently");
                return match self.mapped_user(remote).await? {
                    Some(user) => Ok(user),
                    None => Err(MappingError::Duplicate(msg)),
                };
            }
            Err(e) => {
                error!(error = %e, supabase_id = %remote.id, "Failed to create mapping");
                return Err(e);
            }
        };

        info!(
            username = %user.username,
            supabase_id = %remote.id,
            "Created identity mapping"
        );
        self.touch_last_login(&mapping.id).await;
        Ok(user)
    }

    /// User behind an existing mapping for this remote id
    async fn mapped_user(&self, remote: &RemoteUser) -> Result<Option<LocalUser>, MappingError> {
        let mapping = match repository::find_mapping_by_supabase_id(&self.pool, &remote.id).await? {
            Some(mapping) => mapping,
            None => return Ok(None),
        };

        if !mapping.is_active {
            warn!(supabase_id = %remote.id, "Mapping is inactive, refusing authentication");
            return Err(MappingError::Inactive(remote.id.clone()));
        }

        let user = repository::get_user_by_id(&self.pool, &mapping.user_id)
            .await?
            .ok_or_else(|| MappingError::UserNotFound(mapping.user_id.clone()))?;
        self.touch_last_login(&mapping.id).await;
        Ok(Some(user))
    }

    async fn touch_last_login(&self, mapping_id: &str) {
        if let Err(e) = repository::update_last_login(&self.pool, mapping_id).await {
            error!(error = %e, mapping_id = %mapping_id, "Failed to update last login");
        }
    }
}
