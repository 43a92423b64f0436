//! HTTP API layer for Conference Central.
//!
//! Exposes the service operations over JSON/HTTP via Axum:
//!
//! - `POST /api/v1/profile` - create or update the caller's profile
//! - `GET  /api/v1/profile` - fetch the caller's profile
//! - `POST /api/v1/conference` - create a conference
//! - `POST /api/v1/queryConferences` - list all conferences (no auth)
//! - `POST /api/v1/getConferencesCreated` - list the caller's conferences
//!
//! Unversioned `/health` and `/metrics` endpoints sit next to the v1 API.
//! Caller identity arrives in gateway headers; see [`crate::identity`].

pub mod handlers;
pub mod middleware;
pub mod service;

pub use service::ConferenceService;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: ConferenceService,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Unversioned endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        // V1 API
        .nest("/api/v1", v1_router())
        // Middleware
        .layer(axum_middleware::from_fn(middleware::response_headers))
        .layer(axum_middleware::from_fn(middleware::content_type_validation))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// V1 API routes, mounted under `/api/v1`.
fn v1_router() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            post(handlers::save_profile).get(handlers::get_profile),
        )
        .route("/conference", post(handlers::create_conference))
        .route("/queryConferences", post(handlers::query_conferences))
        .route(
            "/getConferencesCreated",
            post(handlers::get_conferences_created),
        )
}

/// Standard response wrapper for API results.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            error_code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: None,
        }
    }

    pub fn error_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            error_code: Some(code.into()),
        }
    }
}
