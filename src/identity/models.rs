//! Local user and identity mapping models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Django's `username` column length, kept for data compatibility
pub const MAX_USERNAME_LEN: usize = 150;

/// Local application user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LocalUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub date_joined: String,
}

/// Link between a local user and a remote identity-provider user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UserMapping {
    pub id: String,
    pub user_id: String,
    pub supabase_id: String,
    pub supabase_email: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login_at: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Mapping already exists: {0}")]
    Duplicate(String),

    #[error("Mapping for remote user {0} is inactive")]
    Inactive(String),

    #[error("Local user not found: {0}")]
    UserNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Derive a username from the email local part, or from the remote id when
/// no email is known. Dots become underscores.
pub fn derive_username(email: Option<&str>, supabase_id: &str) -> String {
    let local_part = email
        .and_then(|e| e.split('@').next())
        .map(str::trim)
        .filter(|p| !p.is_empty());

    match local_part {
        Some(part) => part
            .replace('.', "_")
            .chars()
            .take(MAX_USERNAME_LEN)
            .collect(),
        None => {
            let short: String = supabase_id.chars().take(8).collect();
            format!("user_{}", short)
        }
    }
}
