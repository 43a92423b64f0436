//! Tests for the HTTP surface: routing, identity extraction, middleware,
//! and error mapping.
//!
//! Tests cover:
//! - Health check endpoint
//! - Profile save and fetch
//! - Conference creation and listing
//! - Authorization rejection
//! - Content-Type enforcement
//! - Request/Response serialization

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use conference_core::api::{build_router, ApiResponse, AppState, ConferenceService};
use conference_core::datastore::key::Key;
use conference_core::datastore::Datastore;

// ============================================================================
// Test Utilities
// ============================================================================

fn app() -> Router {
    let service = ConferenceService::new(Arc::new(Datastore::with_defaults()));
    build_router(AppState { service })
}

fn authed_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("x-user-id", "u1")
        .header("x-user-email", "lemoncake@example.com")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn anonymous_post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ============================================================================
// ApiResponse Shape
// ============================================================================

#[test]
fn test_api_response_success_shape() {
    let response = ApiResponse::success("test data");
    assert!(response.success);
    assert_eq!(response.data, Some("test data"));
    assert!(response.error.is_none());
}

#[test]
fn test_api_response_error_shape() {
    let response: ApiResponse<()> = ApiResponse::error_with_code("nope", "UNAUTHORIZED");
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("nope"));
    assert_eq!(response.error_code.as_deref(), Some("UNAUTHORIZED"));
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "healthy");
}

// ============================================================================
// Profile Endpoints
// ============================================================================

#[tokio::test]
async fn test_save_profile_defaults_and_round_trip() {
    let app = app();

    let response = app
        .clone()
        .oneshot(authed_post("/api/v1/profile", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["displayName"], "lemoncake");
    assert_eq!(body["data"]["teeShirtSize"], "NOT_SPECIFIED");
    assert_eq!(body["data"]["conferenceKeysToAttend"], json!([]));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/profile")
                .header("x-user-id", "u1")
                .header("x-user-email", "lemoncake@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["data"]["mainEmail"], "lemoncake@example.com");
}

#[tokio::test]
async fn test_get_profile_requires_identity_headers() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/profile")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_get_profile_before_save_is_not_found() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/v1/profile")
                .header("x-user-id", "u1")
                .header("x-user-email", "lemoncake@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Conference Endpoints
// ============================================================================

#[tokio::test]
async fn test_create_conference_returns_created_with_websafe_key() {
    let response = app()
        .oneshot(authed_post(
            "/api/v1/conference",
            json!({
                "name": "DevCon",
                "topics": [],
                "startDate": "2024-03-15",
                "maxAttendees": 100
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response_json(response).await;
    let data = &body["data"];
    assert_eq!(data["topics"], json!(["Default", "Topic"]));
    assert_eq!(data["city"], "Default City");
    assert_eq!(data["month"], 3);
    assert_eq!(data["seatsAvailable"], 100);
    assert_eq!(data["organizerDisplayName"], "lemoncake");
    // The wire shape never leaks the organizer's user id.
    assert!(data.get("organizerUserId").is_none());

    let token = data["websafeKey"].as_str().unwrap();
    let key = Key::from_websafe(token).unwrap();
    assert_eq!(key.profile_user_id(), Some("u1"));
    assert_eq!(key.conference_id(), Some(1));
}

#[tokio::test]
async fn test_create_conference_without_name_is_unprocessable() {
    let response = app()
        .oneshot(authed_post(
            "/api/v1/conference",
            json!({"maxAttendees": 10}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = response_json(response).await;
    assert_eq!(body["error"]["code"], "MISSING_REQUIRED_FIELD");
}

#[tokio::test]
async fn test_query_conferences_is_public_and_name_ordered() {
    let app = app();

    for name in ["Bravo", "Alpha"] {
        let response = app
            .clone()
            .oneshot(authed_post(
                "/api/v1/conference",
                json!({"name": name, "maxAttendees": 5}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // No identity headers: the public listing still works.
    let response = app
        .oneshot(anonymous_post("/api/v1/queryConferences", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Alpha", "Bravo"]);
}

#[tokio::test]
async fn test_get_conferences_created_requires_identity() {
    let response = app()
        .oneshot(anonymous_post("/api/v1/getConferencesCreated", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Middleware
// ============================================================================

#[tokio::test]
async fn test_post_without_content_type_is_rejected() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/queryConferences")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_responses_carry_request_id_header() {
    let response = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(
        response.headers().get("x-api-version").unwrap(),
        "1.0"
    );
}
