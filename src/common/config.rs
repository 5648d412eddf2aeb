// src/common/config.rs
//! Environment-driven application configuration

use chrono::Duration;
use std::collections::HashSet;
use std::env;
use tracing::warn;

use crate::services::supabase::SupabaseConfig;

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub admin_emails: HashSet<String>,
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub environment: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub supabase: SupabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://cohort_auth.db".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_emails: HashSet::new(),
            cors_origins: parse_list(DEFAULT_CORS_ORIGINS),
            port: 8080,
            environment: "production".to_string(),
            access_token_ttl: Duration::minutes(60),
            refresh_token_ttl: Duration::days(7),
            supabase: SupabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }

        // JWT_SECRET - signs locally issued access/refresh tokens
        if let Ok(secret) = env::var("JWT_SECRET") {
            config.jwt_secret = secret;
        }

        // ADMIN_EMAILS - comma-separated, compared lowercase
        if let Ok(raw) = env::var("ADMIN_EMAILS") {
            config.admin_emails = parse_admin_emails(&raw);
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = parse_list(&origins);
        }

        if let Some(port) = env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            config.port = port;
        }

        if let Ok(environment) = env::var("ENVIRONMENT") {
            config.environment = environment.to_lowercase();
        }

        if let Ok(raw) = env::var("ACCESS_TOKEN_TTL_MINUTES") {
            match parse_ttl(&raw, Duration::try_minutes) {
                Some(ttl) => config.access_token_ttl = ttl,
                None => warn!(value = %raw, "Invalid ACCESS_TOKEN_TTL_MINUTES, keeping default"),
            }
        }

        if let Ok(raw) = env::var("REFRESH_TOKEN_TTL_DAYS") {
            match parse_ttl(&raw, Duration::try_days) {
                Some(ttl) => config.refresh_token_ttl = ttl,
                None => warn!(value = %raw, "Invalid REFRESH_TOKEN_TTL_DAYS, keeping default"),
            }
        }

        config.supabase = SupabaseConfig::from_env();

        config
    }

    pub fn is_production(&self) -> bool {
        self.environment != "development"
    }

    /// Refuse to run production with a missing or well-known JWT secret
    pub fn validate(&self) -> anyhow::Result<()> {
        let secret = self.jwt_secret.trim();
        if self.is_production() && (secret.is_empty() || secret == DEFAULT_JWT_SECRET) {
            anyhow::bail!("JWT_SECRET must be set to a private value in production");
        }
        Ok(())
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.to_lowercase())
    }
}

pub fn parse_admin_emails(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Positive integer TTL; `None` when unparsable or out of range
fn parse_ttl(raw: &str, unit: fn(i64) -> Option<Duration>) -> Option<Duration> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .and_then(unit)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
