// src/app.rs
use axum::{
    extract::Extension,
    http::{header, HeaderName, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::{auth_middleware, auth_routes};
use crate::common::AppState;
use crate::health::health_routes;
use crate::logging_middleware::log_request_response;
use crate::sync::sync_routes;

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

/// Full application router. Layers run outermost-last: the state extension
/// must wrap the auth middleware that reads it.
pub fn build_router(shared: Arc<RwLock<AppState>>, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(auth_routes())
        .merge(sync_routes())
        .merge(health_routes())
        .layer(middleware::from_fn(log_request_response))
        .layer(middleware::from_fn(auth_middleware))
        .layer(Extension(shared))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
}
