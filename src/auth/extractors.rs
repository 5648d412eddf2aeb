//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::{debug, warn};

use super::models::{AuthContext, AuthSource, CurrentUser};
use crate::common::ApiError;
use crate::identity::LocalUser;

/// Authenticated user extractor
///
/// Reads the [`AuthContext`] left by the auth middleware. A missing token is
/// "Authentication required"; a token that failed verification is
/// "Invalid Supabase token".
#[derive(Debug)]
pub struct AuthedUser {
    pub user: LocalUser,
    pub is_admin: bool,
    pub source: AuthSource,
}

impl From<CurrentUser> for AuthedUser {
    fn from(current: CurrentUser) -> Self {
        Self {
            user: current.user,
            is_admin: current.is_admin,
            source: current.source,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(AuthContext::Authenticated(current)) => Ok(current.clone().into()),
            Some(AuthContext::Rejected) => {
                debug!(path = %parts.uri.path(), "Rejected token on protected route");
                Err(ApiError::Unauthorized("Invalid Supabase token".into()))
            }
            _ => Err(ApiError::Unauthorized("Authentication required".into())),
        }
    }
}

/// Authenticated user with staff, superuser, or ADMIN_EMAILS privileges
#[derive(Debug)]
pub struct AdminUser(pub AuthedUser);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let authed = AuthedUser::from_request_parts(parts, state).await?;
        if !authed.is_admin {
            warn!(user_id = %authed.user.id, "Admin access denied");
            return Err(ApiError::Forbidden("Admin access required".into()));
        }
        Ok(AdminUser(authed))
    }
}
