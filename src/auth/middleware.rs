//! Request authentication middleware
//!
//! Resolves the bearer token to a local user and stores an [`AuthContext`] in
//! the request extensions. Failures never short-circuit the request; they
//! degrade to `Rejected` and the route guards decide what that means.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::models::{AuthContext, AuthSource, CurrentUser};
use super::tokens::{decode_token, TokenType};
use crate::common::{safe_email_log, safe_token_log, AppState};
use crate::identity::{repository, IdentityMapper, LocalUser, MappingError};
use crate::services::SupabaseError;

const SKIP_AUTH_PREFIXES: [&str; 6] = [
    "/admin/",
    "/static/",
    "/media/",
    "/api/health",
    "/api/supabase/health",
    "/health/",
];

pub fn should_skip_auth(path: &str) -> bool {
    SKIP_AUTH_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

/// Token from a `Bearer <token>` Authorization header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
}

pub async fn auth_middleware(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    mut request: Request,
    next: Next,
) -> Response {
    if should_skip_auth(request.uri().path()) {
        return next.run(request).await;
    }

    let state = state_lock.read().await.clone();
    let context = authenticate(&state, request.headers()).await;
    request.extensions_mut().insert(context);

    next.run(request).await
}

fn current_user(state: &AppState, user: LocalUser, source: AuthSource) -> CurrentUser {
    let is_admin = user.is_staff
        || user.is_superuser
        || state.config.is_admin_email(&user.email)
        || (source == AuthSource::Dev && state.dev_mode.user_is_admin);

    CurrentUser {
        user,
        is_admin,
        source,
    }
}

/// Subject of a locally issued token, if it may still authenticate. The user
/// must be active and its mapping, when one exists, must not be disabled.
pub async fn active_local_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<LocalUser>, MappingError> {
    let user = match repository::get_user_by_id(pool, user_id).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            warn!(user_id = %user_id, "Local token for inactive user");
            return Ok(None);
        }
        None => {
            warn!(user_id = %user_id, "Local token for unknown user");
            return Ok(None);
        }
    };

    if let Some(mapping) = repository::find_mapping_for_user(pool, user_id).await? {
        if !mapping.is_active {
            warn!(user_id = %user_id, supabase_id = %mapping.supabase_id, "Local token for disabled mapping");
            return Ok(None);
        }
    }

    Ok(Some(user))
}

pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> AuthContext {
    // DEV MODE: every request is the dev user
    if state.dev_mode.is_enabled() {
        return match state.dev_mode.ensure_dev_user(&state.db).await {
            Ok(user) => {
                debug!(user_id = %user.id, "DEV MODE: token verification bypassed");
                AuthContext::Authenticated(current_user(state, user, AuthSource::Dev))
            }
            Err(e) => {
                error!(error = %e, "DEV MODE: failed to load dev user");
                AuthContext::Rejected
            }
        };
    }

    let token = match bearer_token(headers) {
        Some(t) => t,
        None => return AuthContext::Anonymous,
    };
    info!(token = %safe_token_log(token), "Received Authorization token");

    // Locally issued access token
    if let Ok(claims) = decode_token(&state.config.jwt_secret, token, TokenType::Access) {
        return match active_local_user(&state.db, &claims.sub).await {
            Ok(Some(user)) => {
                AuthContext::Authenticated(current_user(state, user, AuthSource::Local))
            }
            Ok(None) => AuthContext::Rejected,
            Err(e) => {
                error!(error = %e, "Database error loading user for local token");
                AuthContext::Rejected
            }
        };
    }

    // Otherwise ask the identity provider
    let remote = match state.identity_provider.get_user(token).await {
        Ok(remote) => remote,
        Err(SupabaseError::InvalidToken) => {
            warn!("Supabase returned no user for token");
            return AuthContext::Rejected;
        }
        Err(e) => {
            error!(error = %e, "Token verification error");
            return AuthContext::Rejected;
        }
    };

    match IdentityMapper::new(state.db.clone()).resolve(&remote).await {
        Ok(user) if user.is_active => {
            debug!(
                user_id = %user.id,
                email = %safe_email_log(&user.email),
                "Supabase token mapped to local user"
            );
            AuthContext::Authenticated(current_user(state, user, AuthSource::Supabase))
        }
        Ok(user) => {
            warn!(user_id = %user.id, "Local user is inactive");
            AuthContext::Rejected
        }
        Err(e) => {
            error!(error = %e, supabase_id = %remote.id, "Failed to map Supabase user");
            AuthContext::Rejected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_should_skip_auth() {
        assert!(should_skip_auth("/admin/login"));
        assert!(should_skip_auth("/static/app.js"));
        assert!(should_skip_auth("/api/health/"));
        assert!(should_skip_auth("/api/health"));
        assert!(should_skip_auth("/api/supabase/health"));
        assert!(should_skip_auth("/health/ready"));
        assert!(!should_skip_auth("/api/supabase/me"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));
    }
}
