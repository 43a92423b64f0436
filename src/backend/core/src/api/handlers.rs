//! API request handlers with proper error propagation.
//!
//! All handlers return `Result<impl IntoResponse, ConferenceError>` so that
//! errors are automatically converted to appropriate HTTP status codes via
//! the `IntoResponse` implementation on `ConferenceError`.

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::conference::{Conference, ConferenceForm};
use crate::error::ConferenceError;
use crate::identity::Identity;
use crate::observability;
use crate::profile::{Profile, ProfileForm, TeeShirtSize};

// ═══════════════════════════════════════════════════════════════════════════════
// Health Check
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn prometheus_metrics() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        observability::prometheus_metrics(),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wire DTOs
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user_id: String,
    pub display_name: String,
    pub main_email: String,
    pub tee_shirt_size: TeeShirtSize,
    /// Reserved; always empty.
    pub conference_keys_to_attend: Vec<String>,
}

impl From<&Profile> for ProfileResponse {
    fn from(profile: &Profile) -> Self {
        Self {
            user_id: profile.user_id().to_string(),
            display_name: profile.display_name().to_string(),
            main_email: profile.main_email().to_string(),
            tee_shirt_size: profile.tee_shirt_size(),
            conference_keys_to_attend: Vec::new(),
        }
    }
}

/// Conference as exposed on the wire. The organizer's user id and the
/// parent key stay server-side; the web-safe key is the public handle.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceResponse {
    pub websafe_key: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub city: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    pub month: u32,
    pub max_attendees: u32,
    pub seats_available: u32,
    pub organizer_display_name: String,
}

impl ConferenceResponse {
    fn new(conference: &Conference, organizer_display_name: String) -> Result<Self, ConferenceError> {
        Ok(Self {
            websafe_key: conference.websafe_key()?,
            name: conference.name().to_string(),
            description: conference.description().map(str::to_string),
            topics: conference.topics().to_vec(),
            city: conference.city().to_string(),
            start_date: conference.start_date(),
            end_date: conference.end_date(),
            month: conference.month(),
            max_attendees: conference.max_attendees(),
            seats_available: conference.seats_available(),
            organizer_display_name,
        })
    }
}

/// Resolve organizer display names once per organizer, not once per
/// conference.
async fn conference_responses(
    state: &AppState,
    conferences: Vec<Conference>,
) -> Result<Vec<ConferenceResponse>, ConferenceError> {
    let mut display_names: HashMap<String, String> = HashMap::new();
    let mut responses = Vec::with_capacity(conferences.len());

    for conference in &conferences {
        let organizer = conference.organizer_user_id();
        let display_name = match display_names.get(organizer) {
            Some(name) => name.clone(),
            None => {
                let name = state.service.organizer_display_name(conference).await?;
                display_names.insert(organizer.to_string(), name.clone());
                name
            }
        };
        responses.push(ConferenceResponse::new(conference, display_name)?);
    }

    Ok(responses)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Profile Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn save_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(form): Json<ProfileForm>,
) -> Result<impl IntoResponse, ConferenceError> {
    let profile = state.service.save_profile(&identity, form).await?;
    Ok(Json(ApiResponse::success(ProfileResponse::from(&profile))))
}

pub async fn get_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ConferenceError> {
    let profile = state
        .service
        .get_profile(&identity)
        .await?
        .ok_or_else(|| ConferenceError::not_found("Profile", &identity.user_id))?;
    Ok(Json(ApiResponse::success(ProfileResponse::from(&profile))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Conference Handlers
// ═══════════════════════════════════════════════════════════════════════════════

pub async fn create_conference(
    State(state): State<AppState>,
    identity: Identity,
    Json(form): Json<ConferenceForm>,
) -> Result<impl IntoResponse, ConferenceError> {
    let conference = state.service.create_conference(&identity, form).await?;
    let display_name = state.service.organizer_display_name(&conference).await?;
    let response = ConferenceResponse::new(&conference, display_name)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// Public listing; the only operation that accepts anonymous callers.
pub async fn query_conferences(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ConferenceError> {
    let conferences = state.service.query_conferences().await?;
    let responses = conference_responses(&state, conferences).await?;
    Ok(Json(ApiResponse::success(responses)))
}

pub async fn get_conferences_created(
    State(state): State<AppState>,
    identity: Identity,
) -> Result<impl IntoResponse, ConferenceError> {
    let conferences = state.service.conferences_created_by(&identity).await?;
    let responses = conference_responses(&state, conferences).await?;
    Ok(Json(ApiResponse::success(responses)))
}
