// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::services::IdentityProvider;

/// Application state containing database pool, identity provider, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: AppConfig,
    pub dev_mode: DevModeConfig,
    pub identity_provider: Arc<dyn IdentityProvider>,
}
