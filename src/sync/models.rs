// src/sync/models.rs

use serde::{Deserialize, Serialize};

use crate::identity::{LocalUser, MappingError};
use crate::services::SupabaseError;

/// Per-user error messages kept in a report
pub const MAX_REPORTED_ERRORS: usize = 10;
/// Characters kept from each per-user error message
pub const ERROR_MESSAGE_LEN: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Supabase(#[from] SupabaseError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// Outcome of backfilling mappings for unmapped local users
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub total_users: i64,
    pub already_mapped: i64,
    pub created: usize,
    pub not_found: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub final_mapped: i64,
    pub remaining: i64,
}

/// Outcome of importing remote users into the local store
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub success: bool,
    pub message: String,
    pub supabase_users_found: usize,
    pub created_users: usize,
    pub created_mappings: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    pub total_users: i64,
    pub total_mappings: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnmappedUser {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<LocalUser> for UnmappedUser {
    fn from(user: LocalUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// Diff of both user stores
#[derive(Debug, Clone, Serialize)]
pub struct MappingStatus {
    pub total_users: i64,
    pub mapped: i64,
    pub unmapped: i64,
    pub unmapped_users: Vec<UnmappedUser>,
    pub supabase_configured: bool,
    pub supabase_users: Option<usize>,
    /// Remote ids with no local mapping
    pub orphaned_supabase_ids: Vec<String>,
    pub supabase_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleMappingRequest {
    pub is_active: bool,
}
