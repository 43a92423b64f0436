#![allow(clippy::result_large_err)]
//! # Conference Central Core
//!
//! Backend for the Conference Central application.
//!
//! ## Architecture
//!
//! - **Identity**: resolves the gateway-authenticated caller into a stable user id
//! - **Profile / Conference aggregates**: self-validating domain objects; the
//!   conference owns the seat counter and its capacity arithmetic
//! - **Datastore**: entity-group storage with ancestor queries and optimistic
//!   transactions
//! - **Service API**: profile save/fetch, conference creation and listing,
//!   transactional seat accounting
//! - **Observability**: structured logging and Prometheus metrics

pub mod api;
pub mod conference;
pub mod config;
pub mod datastore;
pub mod error;
pub mod identity;
pub mod observability;
pub mod profile;

pub use error::{ConferenceError, ErrorCode, ErrorContext, ErrorDetails, ErrorSeverity, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{AppState, ConferenceService};
    pub use crate::conference::{Conference, ConferenceForm};
    pub use crate::datastore::key::Key;
    pub use crate::datastore::{Datastore, Entity, Transaction};
    pub use crate::error::{ConferenceError, ErrorCode, Result};
    pub use crate::identity::{AuthenticatedUser, Identity};
    pub use crate::profile::{Profile, ProfileForm, TeeShirtSize};
}
