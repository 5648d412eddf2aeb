//! Authentication data models

use serde::{Deserialize, Serialize};

use crate::identity::LocalUser;

/// How the current request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthSource {
    Supabase,
    Local,
    Dev,
}

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: LocalUser,
    pub is_admin: bool,
    pub source: AuthSource,
}

/// Per-request authentication outcome, stored in request extensions
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// No bearer token was sent
    Anonymous,
    /// A bearer token was sent but could not be verified or mapped
    Rejected,
    Authenticated(CurrentUser),
}

/// Current user payload
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_admin: bool,
    pub date_joined: String,
    pub auth_source: AuthSource,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginUser {
    pub id: String,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
    pub user: LoginUser,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access: String,
}

/// Error body for the token endpoints (`{detail, code}`)
#[derive(Debug, Serialize)]
pub struct TokenErrorBody {
    pub detail: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub message: String,
    pub user: String,
    pub access_granted: bool,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub mapped_users: i64,
    pub unmapped_users: i64,
    pub active_mappings: i64,
    pub logins_last_24h: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStatsResponse {
    pub message: String,
    pub admin: String,
    pub stats: AdminStats,
}

#[derive(Debug, Serialize)]
pub struct EchoHeadersResponse {
    pub authorization_header_present: bool,
    pub authorization_preview: String,
}
