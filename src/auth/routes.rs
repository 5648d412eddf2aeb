//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/token` - Supabase password login, returns local JWTs
/// - `POST /api/auth/token/refresh` - Refresh an access token
/// - `GET /api/auth/user`, `GET /api/supabase/me` - Current user information
/// - `GET /api/supabase/protected` - Example protected endpoint
/// - `GET /api/supabase/admin/stats` - Mapping statistics (admin)
/// - `GET /api/supabase/echo-headers` - Authorization header preview
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/token", post(handlers::token_login_handler))
        .route(
            "/api/auth/token/refresh",
            post(handlers::token_refresh_handler),
        )
        .route("/api/auth/user", get(handlers::me_handler))
        .route("/api/supabase/me", get(handlers::me_handler))
        .route("/api/supabase/protected", get(handlers::protected_handler))
        .route(
            "/api/supabase/admin/stats",
            get(handlers::admin_stats_handler),
        )
        .route(
            "/api/supabase/echo-headers",
            get(handlers::echo_headers_handler),
        )
}
