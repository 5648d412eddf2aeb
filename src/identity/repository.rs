//! SQL access for local users and identity mappings

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, warn};

use super::models::{derive_username, LocalUser, MappingError, UserMapping, MAX_USERNAME_LEN};
use crate::common::{generate_mapping_id, generate_raw_id, generate_user_id};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, is_staff, is_superuser, is_active, date_joined";

const MAPPING_COLUMNS: &str =
    "id, user_id, supabase_id, supabase_email, is_active, created_at, updated_at, last_login_at";

const MAX_USERNAME_ATTEMPTS: usize = 100;

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

pub async fn get_user_by_id(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<LocalUser>, MappingError> {
    let user = sqlx::query_as::<_, LocalUser>(&format!(
        "SELECT {} FROM users WHERE id = ?",
        USER_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// First local user with a case-insensitive email match, oldest first
pub async fn find_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<LocalUser>, MappingError> {
    let email = email.trim();
    if email.is_empty() {
        return Ok(None);
    }

    let user = sqlx::query_as::<_, LocalUser>(&format!(
        "SELECT {} FROM users WHERE lower(email) = lower(?) ORDER BY date_joined ASC, id ASC LIMIT 1",
        USER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

async fn username_taken(conn: &mut SqliteConnection, username: &str) -> Result<bool, MappingError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(username)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Pick `base`, then `base_2`, `base_3`, ... until one is free
async fn unique_username(conn: &mut SqliteConnection, base: &str) -> Result<String, MappingError> {
    if !username_taken(conn, base).await? {
        return Ok(base.to_string());
    }

    for n in 2..=MAX_USERNAME_ATTEMPTS {
        let suffix = format!("_{}", n);
        let stem: String = base
            .chars()
            .take(MAX_USERNAME_LEN - suffix.len())
            .collect();
        let candidate = format!("{}{}", stem, suffix);
        if !username_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
    }

    let suffix = format!("_{}", generate_raw_id(6).to_lowercase());
    let stem: String = base
        .chars()
        .take(MAX_USERNAME_LEN - suffix.len())
        .collect();
    warn!(base = %base, "Username suffixes exhausted, using random suffix");
    Ok(format!("{}{}", stem, suffix))
}

/// Create a local user for a remote account. Local users carry no password.
pub async fn create_user(
    pool: &SqlitePool,
    email: Option<&str>,
    supabase_id: &str,
) -> Result<LocalUser, MappingError> {
    let mut conn = pool.acquire().await?;
    insert_user(&mut conn, email, supabase_id).await
}

/// Create a local user and its mapping in one transaction. A `Duplicate`
/// mapping rolls the user back.
pub async fn create_user_with_mapping(
    pool: &SqlitePool,
    email: Option<&str>,
    supabase_id: &str,
    supabase_email: &str,
) -> Result<(LocalUser, UserMapping), MappingError> {
    let mut tx = pool.begin().await?;
    let user = insert_user(&mut tx, email, supabase_id).await?;
    let mapping = insert_mapping(&mut tx, &user.id, supabase_id, supabase_email).await?;
    tx.commit().await?;
    Ok((user, mapping))
}

async fn insert_user(
    conn: &mut SqliteConnection,
    email: Option<&str>,
    supabase_id: &str,
) -> Result<LocalUser, MappingError> {
    let username = unique_username(conn, &derive_username(email, supabase_id)).await?;
    let user = LocalUser {
        id: generate_user_id(),
        username,
        email: email.unwrap_or_default().trim().to_string(),
        first_name: None,
        last_name: None,
        is_staff: false,
        is_superuser: false,
        is_active: true,
        date_joined: Utc::now().to_rfc3339(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, is_staff, is_superuser, is_active, date_joined)
        VALUES (?, ?, ?, 0, 0, 1, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.date_joined)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            MappingError::Duplicate(format!("username {} already exists", user.username))
        } else {
            MappingError::Database(e)
        }
    })?;

    debug!(user_id = %user.id, username = %user.username, "Local user created");
    Ok(user)
}

pub async fn find_mapping_by_supabase_id(
    pool: &SqlitePool,
    supabase_id: &str,
) -> Result<Option<UserMapping>, MappingError> {
    let mapping = sqlx::query_as::<_, UserMapping>(&format!(
        "SELECT {} FROM supabase_user_mapping WHERE supabase_id = ?",
        MAPPING_COLUMNS
    ))
    .bind(supabase_id)
    .fetch_optional(pool)
    .await?;
    Ok(mapping)
}

pub async fn find_mapping_for_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<UserMapping>, MappingError> {
    let mapping = sqlx::query_as::<_, UserMapping>(&format!(
        "SELECT {} FROM supabase_user_mapping WHERE user_id = ?",
        MAPPING_COLUMNS
    ))
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(mapping)
}

/// Insert a mapping. Either side already being mapped yields `Duplicate`.
pub async fn create_mapping(
    pool: &SqlitePool,
    user_id: &str,
    supabase_id: &str,
    supabase_email: &str,
) -> Result<UserMapping, MappingError> {
    let mut conn = pool.acquire().await?;
    insert_mapping(&mut conn, user_id, supabase_id, supabase_email).await
}

async fn insert_mapping(
    conn: &mut SqliteConnection,
    user_id: &str,
    supabase_id: &str,
    supabase_email: &str,
) -> Result<UserMapping, MappingError> {
    let now = Utc::now().to_rfc3339();
    let mapping = UserMapping {
        id: generate_mapping_id(),
        user_id: user_id.to_string(),
        supabase_id: supabase_id.to_string(),
        supabase_email: supabase_email.to_string(),
        is_active: true,
        created_at: now.clone(),
        updated_at: now,
        last_login_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO supabase_user_mapping
            (id, user_id, supabase_id, supabase_email, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&mapping.id)
    .bind(&mapping.user_id)
    .bind(&mapping.supabase_id)
    .bind(&mapping.supabase_email)
    .bind(&mapping.created_at)
    .bind(&mapping.updated_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            MappingError::Duplicate(format!(
                "user {} or remote id {} is already mapped",
                user_id, supabase_id
            ))
        } else {
            MappingError::Database(e)
        }
    })?;

    Ok(mapping)
}

pub async fn update_last_login(pool: &SqlitePool, mapping_id: &str) -> Result<(), MappingError> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "UPDATE supabase_user_mapping SET last_login_at = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&now)
    .bind(&now)
    .bind(mapping_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Returns the updated mapping, or `None` when the remote id is unknown
pub async fn set_mapping_active(
    pool: &SqlitePool,
    supabase_id: &str,
    is_active: bool,
) -> Result<Option<UserMapping>, MappingError> {
    let result = sqlx::query(
        "UPDATE supabase_user_mapping SET is_active = ?, updated_at = ? WHERE supabase_id = ?",
    )
    .bind(is_active)
    .bind(Utc::now().to_rfc3339())
    .bind(supabase_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    find_mapping_by_supabase_id(pool, supabase_id).await
}

pub async fn count_users(pool: &SqlitePool) -> Result<i64, MappingError> {
    Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?)
}

pub async fn count_mappings(pool: &SqlitePool) -> Result<i64, MappingError> {
    Ok(
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM supabase_user_mapping")
            .fetch_one(pool)
            .await?,
    )
}

pub async fn count_active_mappings(pool: &SqlitePool) -> Result<i64, MappingError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM supabase_user_mapping WHERE is_active = 1",
    )
    .fetch_one(pool)
    .await?)
}

/// Mappings with a login at or after `since` (RFC 3339, UTC)
pub async fn count_recent_logins(pool: &SqlitePool, since: &str) -> Result<i64, MappingError> {
    Ok(sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM supabase_user_mapping WHERE last_login_at >= ?",
    )
    .bind(since)
    .fetch_one(pool)
    .await?)
}

/// Local users with no mapping, ordered by email
pub async fn list_unmapped_users(pool: &SqlitePool) -> Result<Vec<LocalUser>, MappingError> {
    let users = sqlx::query_as::<_, LocalUser>(&format!(
        r#"
        SELECT {} FROM users
        WHERE id NOT IN (SELECT user_id FROM supabase_user_mapping)
        ORDER BY email ASC, id ASC
        "#,
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;
    Ok(users)
}

pub async fn list_mapped_supabase_ids(pool: &SqlitePool) -> Result<HashSet<String>, MappingError> {
    let ids = sqlx::query_scalar::<_, String>("SELECT supabase_id FROM supabase_user_mapping")
        .fetch_all(pool)
        .await?;
    Ok(ids.into_iter().collect())
}
