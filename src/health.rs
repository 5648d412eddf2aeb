// src/health.rs
//! Liveness and readiness endpoints

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::error;

use crate::common::AppState;

pub const SERVICE_NAME: &str = "cohort-auth";

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub environment: String,
    pub database: String,
    pub supabase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_error: Option<String>,
}

async fn ping_database(state: &AppState) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(&state.db).await.map(|_| ())
}

/// GET /api/health, GET /api/supabase/health
pub async fn health_check(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    let state = state_lock.read().await.clone();

    let supabase = if state.identity_provider.is_configured() {
        "configured"
    } else {
        "not configured"
    };

    let mut body = HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        environment: state.config.environment.clone(),
        database: "connected".to_string(),
        supabase: supabase.to_string(),
        database_error: None,
    };

    match ping_database(&state).await {
        Ok(()) => (StatusCode::OK, Json(body)),
        Err(e) => {
            error!(error = %e, "Health check database ping failed");
            body.status = "unhealthy".to_string();
            body.database = "error".to_string();
            body.database_error = Some(e.to_string());
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
    }
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

/// GET /health/ready
pub async fn readiness(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> impl IntoResponse {
    let state = state_lock.read().await.clone();

    match ping_database(&state).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ready" }))),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "not ready", "error": e.to_string() })),
            )
        }
    }
}

pub fn health_routes() -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/supabase/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
}
