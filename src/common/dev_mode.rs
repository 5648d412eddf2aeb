// src/common/dev_mode.rs
//! Development mode configuration and utilities
//! Authenticates every request as a fixed local user for testing purposes

use sqlx::SqlitePool;
use std::env;

use crate::identity::{repository, LocalUser, MappingError};

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
    pub user_email: String,
    pub user_is_admin: bool,
}

impl Default for DevModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_email: "dev@test.com".to_string(),
            user_is_admin: false,
        }
    }
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let enabled = env::var("DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        let user_email = env::var("DEV_USER_EMAIL").unwrap_or_else(|_| "dev@test.com".to_string());

        let user_is_admin = env::var("DEV_USER_IS_ADMIN")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";

        Self {
            enabled,
            user_email,
            user_is_admin,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Load the dev user, creating it on first use
    pub async fn ensure_dev_user(&self, pool: &SqlitePool) -> Result<LocalUser, MappingError> {
        if let Some(user) = repository::find_user_by_email(pool, &self.user_email).await? {
            return Ok(user);
        }
        repository::create_user(pool, Some(&self.user_email), "dev").await
    }
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        println!("⚠️  🔓 DEV MODE ENABLED 🔓 ⚠️");
        println!("   Token verification bypassed for testing");
        println!("   Dev User: {}", config.user_email);
        println!(
            "   Admin: {}",
            if config.user_is_admin { "Yes" } else { "No" }
        );
        println!("   ⚠️  DO NOT USE IN PRODUCTION ⚠️");
        println!();
    } else {
        println!("🔒 Production mode - Authentication required");
    }
}

/// CLI argument parsing for dev mode
pub fn parse_dev_mode_args(args: &[String]) -> Option<bool> {
    for arg in args {
        match arg.as_str() {
            "--dev" | "--dev-mode" => return Some(true),
            "--no-dev" | "--prod" | "--production" => return Some(false),
            _ => {}
        }
    }

    None
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig, args: &[String]) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args(args) {
        println!("🔧 CLI override: DEV_MODE = {}", cli_dev_mode);
        config.enabled = cli_dev_mode;
    }

    config
}
