//! API middleware for validation and standard response headers.
//!
//! This module provides middleware functions for:
//! - Content-Type validation (enforces application/json for mutation requests)
//! - Standard response headers (API version, request id)

use axum::{
    extract::Request,
    http::{
        header::{HeaderName, HeaderValue, CONTENT_TYPE},
        Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

/// Middleware that validates the Content-Type header for mutation requests.
///
/// POST, PUT, and PATCH requests must include `Content-Type:
/// application/json`. GET, DELETE, HEAD, and OPTIONS requests are allowed
/// without Content-Type.
pub async fn content_type_validation(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        match content_type {
            Some(ct) if ct.contains("application/json") => {}
            Some(_) => {
                return (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Json(serde_json::json!({
                        "success": false,
                        "error": "Content-Type must be application/json",
                        "error_code": "UNSUPPORTED_MEDIA_TYPE"
                    })),
                )
                    .into_response();
            }
            None => {
                return (
                    StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    Json(serde_json::json!({
                        "success": false,
                        "error": "Content-Type header is required for this request",
                        "error_code": "MISSING_CONTENT_TYPE"
                    })),
                )
                    .into_response();
            }
        }
    }
    next.run(req).await
}

/// Middleware that adds standard API response headers.
pub async fn response_headers(req: Request, next: Next) -> Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    let _ = headers.try_insert(
        HeaderName::from_static("x-api-version"),
        HeaderValue::from_static("1.0"),
    );
    if let Ok(val) = HeaderValue::from_str(&request_id) {
        let _ = headers.try_insert(HeaderName::from_static("x-request-id"), val);
    }
    let _ = headers.try_insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );

    response
}
