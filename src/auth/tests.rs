//! Tests for auth module
//!
//! These tests verify:
//! - Bearer token verification and lazy mapping through the full router
//! - 401/403 guard behavior
//! - Password login and refresh token exchange
//! - Dev mode bypass

#[cfg(test)]
mod tests {
    use super::super::tokens::{decode_token, issue_token, TokenType};
    use crate::app::build_router;
    use crate::common::dev_mode::DevModeConfig;
    use crate::identity::repository;
    use crate::services::supabase::fake::FakeIdentityProvider;
    use crate::services::RemoteUser;
    use crate::test_support::{
        deactivate_user, make_staff, memory_pool, shared_state, TEST_JWT_SECRET,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use chrono::Duration;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get_with_token(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header("Authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_token_returns_mapped_user() {
        let pool = memory_pool().await;
        let user = repository::create_user(&pool, Some("mia@cohort.dev"), "seed")
            .await
            .unwrap();
        let mapping = repository::create_mapping(&pool, &user.id, "remote-mia", "mia@cohort.dev")
            .await
            .unwrap();
        let provider = FakeIdentityProvider::new()
            .with_token("tok-mia", RemoteUser::new("remote-mia", Some("mia@cohort.dev")));
        let app = build_router(shared_state(pool.clone(), provider), &[]);

        let (status, body) = send(app, get_with_token("/api/supabase/me", "tok-mia")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user.id.as_str());
        assert_eq!(body["username"], "mia");
        assert_eq!(body["is_admin"], false);
        assert_eq!(body["auth_source"], "supabase");

        let touched = repository::find_mapping_by_supabase_id(&pool, "remote-mia")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(touched.id, mapping.id);
        assert!(touched.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_first_login_creates_user_and_mapping() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new()
            .with_token("tok-new", RemoteUser::new("remote-new", Some("new.kid@cohort.dev")));
        let app = build_router(shared_state(pool.clone(), provider), &[]);

        let (status, body) = send(app, get_with_token("/api/auth/user", "tok-new")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "new_kid");
        assert_eq!(repository::count_users(&pool).await.unwrap(), 1);
        assert_eq!(repository::count_mappings(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_token_is_rejected() {
        let pool = memory_pool().await;
        let app = build_router(shared_state(pool, FakeIdentityProvider::new()), &[]);

        let (status, body) =
            send(app, get_with_token("/api/supabase/protected", "not-a-token")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid Supabase token");
    }

    #[tokio::test]
    async fn test_missing_token_requires_authentication() {
        let pool = memory_pool().await;
        let app = build_router(shared_state(pool, FakeIdentityProvider::new()), &[]);

        let (status, body) = send(
            app,
            Request::get("/api/supabase/protected")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authentication required");
        assert_eq!(body["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_inactive_mapping_cannot_authenticate() {
        let pool = memory_pool().await;
        let user = repository::create_user(&pool, Some("gone@cohort.dev"), "seed")
            .await
            .unwrap();
        repository::create_mapping(&pool, &user.id, "remote-gone", "gone@cohort.dev")
            .await
            .unwrap();
        repository::set_mapping_active(&pool, "remote-gone", false)
            .await
            .unwrap();
        let provider = FakeIdentityProvider::new()
            .with_token("tok-gone", RemoteUser::new("remote-gone", Some("gone@cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, _) = send(app, get_with_token("/api/supabase/me", "tok-gone")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_payload() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new()
            .with_token("tok", RemoteUser::new("remote-1", Some("pat@cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) = send(app, get_with_token("/api/supabase/protected", "tok")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"], "pat");
        assert_eq!(body["access_granted"], true);
    }

    #[tokio::test]
    async fn test_admin_stats_forbidden_for_regular_user() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new()
            .with_token("tok", RemoteUser::new("remote-1", Some("pat@cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) =
            send(app, get_with_token("/api/supabase/admin/stats", "tok")).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Admin access required");
    }

    #[tokio::test]
    async fn test_admin_stats_for_staff_user() {
        let pool = memory_pool().await;
        let staff = repository::create_user(&pool, Some("staff@cohort.dev"), "seed")
            .await
            .unwrap();
        make_staff(&pool, &staff.id).await;
        repository::create_mapping(&pool, &staff.id, "remote-staff", "staff@cohort.dev")
            .await
            .unwrap();
        repository::create_user(&pool, Some("unmapped@cohort.dev"), "seed")
            .await
            .unwrap();
        let provider = FakeIdentityProvider::new()
            .with_token("tok-staff", RemoteUser::new("remote-staff", Some("staff@cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) =
            send(app, get_with_token("/api/supabase/admin/stats", "tok-staff")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"], "staff");
        assert_eq!(body["stats"]["total_users"], 2);
        assert_eq!(body["stats"]["mapped_users"], 1);
        assert_eq!(body["stats"]["unmapped_users"], 1);
        assert_eq!(body["stats"]["active_mappings"], 1);
        assert_eq!(body["stats"]["logins_last_24h"], 1);
    }

    #[tokio::test]
    async fn test_admin_email_grants_admin() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new()
            .with_token("tok-root", RemoteUser::new("remote-root", Some("Root@Cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) = send(app, get_with_token("/api/supabase/me", "tok-root")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_admin"], true);
        assert_eq!(body["is_staff"], false);
    }

    #[tokio::test]
    async fn test_echo_headers() {
        let pool = memory_pool().await;
        let app = build_router(shared_state(pool, FakeIdentityProvider::new()), &[]);

        let (status, body) = send(
            app.clone(),
            Request::get("/api/supabase/echo-headers")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authorization_header_present"], false);
        assert_eq!(body["authorization_preview"], "");

        let long_token = "x".repeat(60);
        let (_, body) = send(
            app,
            get_with_token("/api/supabase/echo-headers", &long_token),
        )
        .await;
        assert_eq!(body["authorization_header_present"], true);
        let preview = body["authorization_preview"].as_str().unwrap();
        assert!(preview.starts_with("Bearer xxx"));
        assert!(preview.ends_with("... (len=67)"));
    }

    #[tokio::test]
    async fn test_password_login_issues_tokens() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new().with_password(
            "lee@cohort.dev",
            "hunter22",
            RemoteUser::new("remote-lee", Some("lee@cohort.dev")),
        );
        let app = build_router(shared_state(pool.clone(), provider), &[]);

        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/auth/token",
                json!({ "email": "lee@cohort.dev", "password": "hunter22" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["email"], "lee@cohort.dev");
        assert_eq!(body["user"]["username"], "lee");
        let access = body["access"].as_str().unwrap().to_string();
        let refresh = body["refresh"].as_str().unwrap().to_string();

        let claims = decode_token(TEST_JWT_SECRET, &access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, body["user"]["id"].as_str().unwrap());
        assert!(decode_token(TEST_JWT_SECRET, &refresh, TokenType::Access).is_err());

        let (status, me) = send(app, get_with_token("/api/supabase/me", &access)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["auth_source"], "local");
        assert_eq!(repository::count_mappings(&pool).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_password_login_errors() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new().with_password(
            "lee@cohort.dev",
            "hunter22",
            RemoteUser::new("remote-lee", Some("lee@cohort.dev")),
        );
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) = send(
            app.clone(),
            post_json("/api/auth/token", json!({ "email": "lee@cohort.dev" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/auth/token",
                json!({ "email": "lee@cohort.dev", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "authentication_failed");
        assert_eq!(
            body["detail"],
            "No active account found with the given credentials"
        );

        let (status, body) = send(
            app,
            Request::post("/api/auth/token")
                .header("Content-Type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "parse_error");
    }

    #[tokio::test]
    async fn test_password_login_without_credentials_configured() {
        let pool = memory_pool().await;
        let app = build_router(
            shared_state(pool, FakeIdentityProvider::unconfigured()),
            &[],
        );

        let (status, body) = send(
            app,
            post_json(
                "/api/auth/token",
                json!({ "email": "lee@cohort.dev", "password": "hunter22" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "server_error");
    }

    #[tokio::test]
    async fn test_refresh_exchanges_for_access_token() {
        let pool = memory_pool().await;
        let user = repository::create_user(&pool, Some("lee@cohort.dev"), "seed")
            .await
            .unwrap();
        let app = build_router(shared_state(pool, FakeIdentityProvider::new()), &[]);

        let refresh = issue_token(
            TEST_JWT_SECRET,
            &user.id,
            TokenType::Refresh,
            Duration::days(1),
        )
        .unwrap();

        let (status, body) = send(
            app.clone(),
            post_json("/api/auth/token/refresh", json!({ "refresh": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access"].as_str().unwrap();
        let claims = decode_token(TEST_JWT_SECRET, access, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user.id);

        // An access token is not accepted as a refresh token
        let (status, body) = send(
            app,
            post_json("/api/auth/token/refresh", json!({ "refresh": access })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");
    }

    #[tokio::test]
    async fn test_dev_mode_authenticates_without_token() {
        let pool = memory_pool().await;
        let shared = shared_state(pool, FakeIdentityProvider::new());
        shared.write().await.dev_mode = DevModeConfig {
            enabled: true,
            user_email: "dev@cohort.dev".to_string(),
            user_is_admin: true,
        };
        let app = build_router(shared, &[]);

        let (status, body) = send(
            app,
            Request::get("/api/supabase/admin/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"], "dev");
    }

    #[tokio::test]
    async fn test_disabled_mapping_revokes_local_tokens() {
        let pool = memory_pool().await;
        let provider = FakeIdentityProvider::new().with_password(
            "lee@cohort.dev",
            "hunter22",
            RemoteUser::new("remote-lee", Some("lee@cohort.dev")),
        );
        let app = build_router(shared_state(pool.clone(), provider), &[]);

        let (status, body) = send(
            app.clone(),
            post_json(
                "/api/auth/token",
                json!({ "email": "lee@cohort.dev", "password": "hunter22" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let access = body["access"].as_str().unwrap().to_string();
        let refresh = body["refresh"].as_str().unwrap().to_string();

        repository::set_mapping_active(&pool, "remote-lee", false)
            .await
            .unwrap();

        let (status, body) = send(app.clone(), get_with_token("/api/supabase/me", &access)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid Supabase token");

        let (status, body) = send(
            app,
            post_json("/api/auth/token/refresh", json!({ "refresh": refresh })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");
    }

    #[tokio::test]
    async fn test_inactive_local_user_rejected_for_supabase_token() {
        let pool = memory_pool().await;
        let user = repository::create_user(&pool, Some("left@cohort.dev"), "seed")
            .await
            .unwrap();
        repository::create_mapping(&pool, &user.id, "remote-left", "left@cohort.dev")
            .await
            .unwrap();
        deactivate_user(&pool, &user.id).await;
        let provider = FakeIdentityProvider::new()
            .with_token("tok-left", RemoteUser::new("remote-left", Some("left@cohort.dev")));
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) = send(app, get_with_token("/api/supabase/me", "tok-left")).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid Supabase token");
    }

    #[tokio::test]
    async fn test_inactive_local_user_cannot_password_login() {
        let pool = memory_pool().await;
        let user = repository::create_user(&pool, Some("left@cohort.dev"), "seed")
            .await
            .unwrap();
        deactivate_user(&pool, &user.id).await;
        let provider = FakeIdentityProvider::new().with_password(
            "left@cohort.dev",
            "hunter22",
            RemoteUser::new("remote-left", Some("left@cohort.dev")),
        );
        let app = build_router(shared_state(pool, provider), &[]);

        let (status, body) = send(
            app,
            post_json(
                "/api/auth/token",
                json!({ "email": "left@cohort.dev", "password": "hunter22" }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "account_disabled");
        assert!(body.get("access").is_none());
    }
}
