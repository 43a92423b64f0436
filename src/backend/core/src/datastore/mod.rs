//! Datastore layer.
//!
//! Persists the profile and conference aggregates behind a small contract:
//! id allocation under a parent key, point loads, multi-entity saves that
//! are atomic within one entity group, name-ordered conference queries
//! (global and ancestor-scoped), and optimistic entity-group transactions.
//!
//! The bundled backend is the in-memory engine in [`memory`]; entity keys
//! and their web-safe string form live in [`key`].

pub mod key;
mod memory;

pub use memory::{Datastore, Entity, Transaction};
