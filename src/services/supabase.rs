// src/services/supabase.rs
//! Supabase Auth (GoTrue) client
//!
//! Verifies bearer tokens, lists users with the service-role key, and performs
//! password sign-in with the anon key. Everything else in the crate talks to the
//! remote identity store through the [`IdentityProvider`] trait.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use tracing::{debug, error, info, warn};

use crate::common::safe_email_log;

/// GoTrue caps admin listing pages; stop once a short page comes back
const ADMIN_PAGE_SIZE: usize = 1000;
const MAX_ADMIN_PAGES: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum SupabaseError {
    #[error("SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set")]
    NotConfigured,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid login credentials")]
    InvalidCredentials,

    #[error("Supabase user missing id")]
    MissingUserId,

    #[error("Supabase API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Default)]
pub struct SupabaseConfig {
    pub url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
}

impl SupabaseConfig {
    pub fn from_env() -> Self {
        Self {
            url: non_empty_env("SUPABASE_URL").map(|u| u.trim_end_matches('/').to_string()),
            service_role_key: non_empty_env("SUPABASE_SERVICE_ROLE_KEY"),
            anon_key: non_empty_env("SUPABASE_ANON_KEY"),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.service_role_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A user as seen by the remote identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub id: String,
    pub email: Option<String>,
}

impl RemoteUser {
    pub fn new(id: &str, email: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            email: email.map(str::to_string),
        }
    }

    fn from_json(value: &Value) -> Result<Self, SupabaseError> {
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or(SupabaseError::MissingUserId)?;
        let email = value
            .get("email")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            id: id.to_string(),
            email,
        })
    }
}

/// Remote identity store operations used by the auth layer and batch reconciler
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// True when URL and service-role credentials are present
    fn is_configured(&self) -> bool;

    /// Validate a bearer token and return the user it belongs to
    async fn get_user(&self, token: &str) -> Result<RemoteUser, SupabaseError>;

    /// List every remote user (service-role)
    async fn list_users(&self) -> Result<Vec<RemoteUser>, SupabaseError>;

    /// Email/password sign-in against the remote provider
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteUser, SupabaseError>;
}

pub struct SupabaseClient {
    http: Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(http: Client, config: SupabaseConfig) -> Self {
        if config.is_configured() {
            info!("Supabase client configured");
        } else {
            warn!("Supabase credentials missing; remote token verification disabled");
        }
        Self { http, config }
    }

    fn service_credentials(&self) -> Result<(&str, &str), SupabaseError> {
        match (&self.config.url, &self.config.service_role_key) {
            (Some(url), Some(key)) => Ok((url.as_str(), key.as_str())),
            _ => Err(SupabaseError::NotConfigured),
        }
    }

    async fn api_error(resp: reqwest::Response) -> SupabaseError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|json| {
                ["msg", "message", "error_description", "error"]
                    .iter()
                    .find_map(|k| json.get(*k).and_then(|v| v.as_str()).map(str::to_string))
            })
            .unwrap_or(body);
        SupabaseError::Api { status, message }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseClient {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn get_user(&self, token: &str) -> Result<RemoteUser, SupabaseError> {
        let (url, key) = self.service_credentials()?;

        let resp = self
            .http
            .get(format!("{}/auth/v1/user", url))
            .header("apikey", key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP error contacting Supabase user endpoint");
                SupabaseError::Http(e)
            })?;

        let status = resp.status();
        debug!(http_status = %status, "Received response from Supabase user endpoint");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(http_status = %status, "Supabase rejected bearer token");
            return Err(SupabaseError::InvalidToken);
        }
        if !status.is_success() {
            return Err(Self::api_error(resp).await);
        }

        let body: Value = resp.json().await?;
        RemoteUser::from_json(&body)
    }

    async fn list_users(&self) -> Result<Vec<RemoteUser>, SupabaseError> {
        let (url, key) = self.service_credentials()?;
        let mut users = Vec::new();

        for page in 1..=MAX_ADMIN_PAGES {
            let resp = self
                .http
                .get(format!("{}/auth/v1/admin/users", url))
                .query(&[
                    ("page", page.to_string()),
                    ("per_page", ADMIN_PAGE_SIZE.to_string()),
                ])
                .header("apikey", key)
                .bearer_auth(key)
                .send()
                .await?;

            if !resp.status().is_success() {
                let err = Self::api_error(resp).await;
                error!(error = %err, page, "Failed to list Supabase users");
                return Err(err);
            }

            let body: Value = resp.json().await?;
            // Older GoTrue versions return a bare array
            let entries = match body {
                Value::Array(items) => items,
                other => other
                    .get("users")
                    .and_then(|u| u.as_array())
                    .cloned()
                    .unwrap_or_default(),
            };

            let page_len = entries.len();
            for entry in &entries {
                match RemoteUser::from_json(entry) {
                    Ok(user) => users.push(user),
                    Err(_) => warn!(page, "Skipping Supabase user without id"),
                }
            }

            if page_len < ADMIN_PAGE_SIZE {
                break;
            }
        }

        info!(count = users.len(), "Fetched Supabase users");
        Ok(users)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<RemoteUser, SupabaseError> {
        let (url, key) = match (&self.config.url, &self.config.anon_key) {
            (Some(url), Some(key)) => (url.as_str(), key.as_str()),
            _ => return Err(SupabaseError::NotConfigured),
        };

        let resp = self
            .http
            .post(format!("{}/auth/v1/token", url))
            .query(&[("grant_type", "password")])
            .header("apikey", key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            warn!(
                email = %safe_email_log(email),
                http_status = %status,
                "Supabase password sign-in rejected"
            );
            return Err(SupabaseError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(Self::api_error(resp).await);
        }

        let body: Value = resp.json().await?;
        let user = body.get("user").ok_or(SupabaseError::MissingUserId)?;
        RemoteUser::from_json(user)
    }
}
