//! Authentication handlers

use axum::{
    extract::{rejection::JsonRejection, Extension, Json},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::extractors::{AdminUser, AuthedUser};
use super::middleware::active_local_user;
use super::models::{
    AccessTokenResponse, AdminStats, AdminStatsResponse, EchoHeadersResponse, LoginRequest,
    LoginUser, ProtectedResponse, RefreshRequest, TokenErrorBody, TokenResponse, UserResponse,
};
use super::tokens::{decode_token, issue_pair, issue_token, TokenType};
use super::validators::LoginValidator;
use crate::common::{safe_email_log, ApiError, AppState, Validator};
use crate::identity::{repository, IdentityMapper, MappingError};
use crate::services::{RemoteUser, SupabaseError};

fn token_error(status: StatusCode, detail: &str, code: &str) -> Response {
    (
        status,
        Json(TokenErrorBody {
            detail: detail.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}

/// GET /api/supabase/me, GET /api/auth/user
/// Returns current authenticated user info
pub async fn me_handler(authed: AuthedUser) -> Json<UserResponse> {
    let user = authed.user;
    Json(UserResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        first_name: user.first_name.unwrap_or_default(),
        last_name: user.last_name.unwrap_or_default(),
        is_staff: user.is_staff,
        is_superuser: user.is_superuser,
        is_admin: authed.is_admin,
        date_joined: user.date_joined,
        auth_source: authed.source,
    })
}

/// GET /api/supabase/protected
pub async fn protected_handler(authed: AuthedUser) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        message: "This is protected data".to_string(),
        user: authed.user.username,
        access_granted: true,
    })
}

/// GET /api/supabase/admin/stats
pub async fn admin_stats_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    AdminUser(admin): AdminUser,
) -> Result<Json<AdminStatsResponse>, ApiError> {
    let state = state_lock.read().await.clone();

    let total_users = repository::count_users(&state.db).await?;
    let mapped_users = repository::count_mappings(&state.db).await?;
    let active_mappings = repository::count_active_mappings(&state.db).await?;
    let since = (Utc::now() - Duration::hours(24)).to_rfc3339();
    let logins_last_24h = repository::count_recent_logins(&state.db, &since).await?;

    info!(
        admin_user_id = %admin.user.id,
        total_users,
        mapped_users,
        "Admin stats fetched"
    );

    Ok(Json(AdminStatsResponse {
        message: "Admin access granted".to_string(),
        admin: admin.user.username,
        stats: AdminStats {
            total_users,
            mapped_users,
            unmapped_users: (total_users - mapped_users).max(0),
            active_mappings,
            logins_last_24h,
        },
    }))
}

/// GET /api/supabase/echo-headers
/// Echoes a short preview of the Authorization header for debugging
pub async fn echo_headers_handler(headers: HeaderMap) -> Json<EchoHeadersResponse> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let preview = if auth_header.is_empty() {
        String::new()
    } else {
        let head: String = auth_header.chars().take(40).collect();
        format!("{}... (len={})", head, auth_header.len())
    };

    Json(EchoHeadersResponse {
        authorization_header_present: !auth_header.is_empty(),
        authorization_preview: preview,
    })
}

/// POST /api/auth/token
/// Signs in with Supabase and returns locally issued JWTs
///
/// # Request Body
/// ```json
/// { "email": "user@example.com", "password": "..." }
/// ```
///
/// # Response
/// ```json
/// { "access": "<jwt>", "refresh": "<jwt>", "user": { "id": "...", "email": "...", "username": "..." } }
/// ```
pub async fn token_login_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let state = state_lock.read().await.clone();

    let Json(payload) = match payload {
        Ok(p) => p,
        Err(e) => {
            debug!(error = %e, "Login body rejected");
            return token_error(StatusCode::BAD_REQUEST, "Invalid JSON", "parse_error");
        }
    };

    let validation = LoginValidator.validate(&payload);
    if !validation.is_valid {
        let fields: Vec<&str> = validation.errors.iter().map(|e| e.field.as_str()).collect();
        debug!(?fields, "Login validation failed");
        let detail = validation
            .first_message()
            .unwrap_or("Email and password required");
        return token_error(StatusCode::BAD_REQUEST, detail, "validation_error");
    }

    let email = payload.email.unwrap_or_default().trim().to_string();
    let password = payload.password.unwrap_or_default();

    let remote = match state
        .identity_provider
        .sign_in_with_password(&email, &password)
        .await
    {
        Ok(remote) => remote,
        Err(SupabaseError::NotConfigured) => {
            error!("Password login attempted without Supabase anon credentials");
            return token_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not configured",
                "server_error",
            );
        }
        Err(SupabaseError::InvalidCredentials) => {
            return token_error(
                StatusCode::UNAUTHORIZED,
                "No active account found with the given credentials",
                "authentication_failed",
            );
        }
        Err(e) => {
            warn!(email = %safe_email_log(&email), error = %e, "Supabase sign-in failed");
            return token_error(
                StatusCode::UNAUTHORIZED,
                &format!("Authentication error: {}", e),
                "authentication_error",
            );
        }
    };

    // The remote profile may omit email; the login email is authoritative here
    let remote = RemoteUser {
        email: remote.email.or_else(|| Some(email.clone())),
        ..remote
    };

    let user = match IdentityMapper::new(state.db.clone()).resolve(&remote).await {
        Ok(user) if user.is_active => user,
        Ok(_) | Err(MappingError::Inactive(_)) => {
            return token_error(
                StatusCode::UNAUTHORIZED,
                "Account is disabled",
                "account_disabled",
            );
        }
        Err(e) => {
            error!(error = %e, supabase_id = %remote.id, "Failed to map user during login");
            return token_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("Server error: {}", e),
                "server_error",
            );
        }
    };

    let pair = match issue_pair(&state.config, &user.id) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "Failed to issue tokens");
            return token_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to issue tokens",
                "server_error",
            );
        }
    };

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        "Password login succeeded"
    );

    Json(TokenResponse {
        access: pair.access,
        refresh: pair.refresh,
        user: LoginUser {
            id: user.id,
            email: user.email,
            username: user.username,
        },
    })
    .into_response()
}

/// POST /api/auth/token/refresh
/// Exchanges a refresh token for a new access token
pub async fn token_refresh_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Response {
    let state = state_lock.read().await.clone();

    let refresh = match payload {
        Ok(Json(RefreshRequest {
            refresh: Some(token),
        })) if !token.is_empty() => token,
        Ok(_) => {
            return token_error(
                StatusCode::BAD_REQUEST,
                "Refresh token required",
                "validation_error",
            )
        }
        Err(_) => return token_error(StatusCode::BAD_REQUEST, "Invalid JSON", "parse_error"),
    };

    let invalid = || {
        token_error(
            StatusCode::UNAUTHORIZED,
            "Token is invalid or expired",
            "token_not_valid",
        )
    };

    let claims = match decode_token(&state.config.jwt_secret, &refresh, TokenType::Refresh) {
        Ok(claims) => claims,
        Err(e) => {
            warn!(error = %e, "Refresh token rejected");
            return invalid();
        }
    };

    match active_local_user(&state.db, &claims.sub).await {
        Ok(Some(_)) => {}
        Ok(None) => return invalid(),
        Err(e) => {
            error!(error = %e, "Database error during token refresh");
            return ApiError::from(e).into_response();
        }
    }

    match issue_token(
        &state.config.jwt_secret,
        &claims.sub,
        TokenType::Access,
        state.config.access_token_ttl,
    ) {
        Ok(access) => Json(AccessTokenResponse { access }).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to issue access token");
            token_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to issue tokens",
                "server_error",
            )
        }
    }
}
