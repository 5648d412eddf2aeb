// Shared fixtures for unit tests

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::common::config::parse_admin_emails;
use crate::common::dev_mode::DevModeConfig;
use crate::common::migrations::run_migrations;
use crate::common::{AppConfig, AppState};
use crate::services::supabase::fake::FakeIdentityProvider;

pub const TEST_JWT_SECRET: &str = "test_secret_key";

/// Single-connection in-memory database with the schema applied
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        admin_emails: parse_admin_emails("root@cohort.dev"),
        environment: "development".to_string(),
        ..AppConfig::default()
    }
}

pub fn shared_state(pool: SqlitePool, provider: FakeIdentityProvider) -> Arc<RwLock<AppState>> {
    Arc::new(RwLock::new(AppState {
        db: pool,
        config: test_config(),
        dev_mode: DevModeConfig::default(),
        identity_provider: Arc::new(provider),
    }))
}

pub async fn make_staff(pool: &SqlitePool, user_id: &str) {
    sqlx::query("UPDATE users SET is_staff = 1 WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn deactivate_user(pool: &SqlitePool, user_id: &str) {
    sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}
