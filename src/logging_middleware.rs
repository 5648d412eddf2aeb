// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use serde_json::Value;
use tracing::{debug, enabled, Level};

const MASKED: &str = "********";
const SECRET_FIELDS: [&str; 5] = ["password", "access", "refresh", "access_token", "refresh_token"];

/// Replace credential fields anywhere in a JSON document
pub fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&key.as_str()) && field.is_string() {
                    *field = Value::String(MASKED.to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn render_body(bytes: &[u8]) -> Option<String> {
    let body_str = std::str::from_utf8(bytes).ok()?;
    match serde_json::from_str::<Value>(body_str) {
        Ok(mut json) => {
            redact(&mut json);
            Some(serde_json::to_string_pretty(&json).unwrap_or_default())
        }
        Err(_) => Some(body_str.to_string()),
    }
}

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Some(request_body) = render_body(&bytes) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %request_body,
                "📥 Request"
            );
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Some(response_body) = render_body(&bytes) {
            debug!(
                status = %parts.status,
                response_body = %response_body,
                "📤 Response"
            );
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_redact_masks_credentials() {
        let mut body = json!({
            "email": "lee@cohort.dev",
            "password": "hunter22",
            "user": { "id": "U_1", "refresh": "eyJ..." },
            "tokens": [{ "access_token": "abc" }]
        });

        redact(&mut body);

        assert_eq!(body["email"], "lee@cohort.dev");
        assert_eq!(body["password"], MASKED);
        assert_eq!(body["user"]["id"], "U_1");
        assert_eq!(body["user"]["refresh"], MASKED);
        assert_eq!(body["tokens"][0]["access_token"], MASKED);
    }

    #[test]
    fn test_redact_keeps_non_string_flags() {
        let mut body = json!({ "access": true, "message": "ok" });
        redact(&mut body);
        assert_eq!(body["access"], true);
    }

    #[test]
    fn test_render_body_plain_text() {
        assert_eq!(render_body(b"hello").as_deref(), Some("hello"));
        assert!(render_body(&[0xff, 0xfe]).is_none());
    }
}
