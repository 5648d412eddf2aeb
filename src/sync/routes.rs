// src/sync/routes.rs

use axum::{
    routing::{get, patch, post},
    Router,
};

use super::handlers;

pub fn sync_routes() -> Router {
    Router::new()
        .route("/api/sync-mappings", get(handlers::bootstrap_sync_mappings))
        .route(
            "/api/supabase/admin/sync-mappings",
            post(handlers::admin_sync_mappings),
        )
        .route(
            "/api/supabase/admin/mapping-status",
            get(handlers::admin_mapping_status),
        )
        .route(
            "/api/supabase/admin/import-users",
            post(handlers::admin_import_users),
        )
        .route(
            "/api/supabase/admin/mappings/:supabase_id/toggle-status",
            patch(handlers::toggle_mapping_status),
        )
}
