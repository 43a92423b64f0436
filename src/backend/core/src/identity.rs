//! Caller identity resolution.
//!
//! Credential validation happens upstream: a trusted gateway authenticates
//! the caller and forwards the result in the `x-user-id` and `x-user-email`
//! headers. This module converts that ambient identity into a stable
//! [`Identity`] and rejects requests that arrive without one, keeping the
//! rest of the core independent of the concrete authentication mechanism.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConferenceError, Result};

/// Header carrying the gateway-verified user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying the gateway-verified email address.
pub const USER_EMAIL_HEADER: &str = "x-user-email";

/// Message returned when a protected operation is called anonymously.
pub const AUTHORIZATION_REQUIRED_MESSAGE: &str = "Authorization required";

/// An authenticated caller as delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
}

/// Stable caller identity used by the service layer.
///
/// `user_id` is opaque, globally unique, and immutable for the lifetime of
/// the account; `email` is whatever address the gateway verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
        }
    }
}

/// Resolve the identity of an optional caller.
///
/// Fails with `Unauthorized` when no caller is present.
pub fn identity_of(caller: Option<&AuthenticatedUser>) -> Result<Identity> {
    match caller {
        Some(user) => Ok(Identity::new(&user.user_id, &user.email)),
        None => Err(ConferenceError::unauthorized(AUTHORIZATION_REQUIRED_MESSAGE)),
    }
}

/// Read the gateway identity headers, if both are present and non-empty.
pub fn caller_from_headers(headers: &HeaderMap) -> Option<AuthenticatedUser> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    Some(AuthenticatedUser {
        user_id: header(USER_ID_HEADER)?,
        email: header(USER_EMAIL_HEADER)?,
    })
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = ConferenceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        let caller = caller_from_headers(&parts.headers);
        identity_of(caller.as_ref())
    }
}
