//! Conference aggregate.
//!
//! A conference lives in its organizer's entity group and carries the seat
//! counter that concurrent booking contends on. All seat arithmetic is
//! implemented here as pure in-memory mutations; callers run them inside an
//! entity-group transaction so the arithmetic always applies to freshly
//! loaded state.
//!
//! Capacity bookkeeping: `seats_allocated = max_attendees - seats_available`
//! is preserved across capacity changes, and a capacity change that would
//! drop below the allocated count is rejected.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::datastore::key::Key;
use crate::error::{ConferenceError, ErrorCode, Result};
use crate::profile::Profile;

/// City recorded when the form leaves it blank.
pub const DEFAULT_CITY: &str = "Default City";

/// Topic list recorded when the form leaves it blank.
pub const DEFAULT_TOPICS: [&str; 2] = ["Default", "Topic"];

/// Client-supplied conference fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConferenceForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub topics: Option<Vec<String>>,
    pub city: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub max_attendees: u32,
}

/// A conference owned by an organizer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conference {
    id: u64,
    organizer_user_id: String,
    name: String,
    description: Option<String>,
    topics: Vec<String>,
    city: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    month: u32,
    max_attendees: u32,
    seats_available: u32,
}

impl Conference {
    /// Construct a conference under the organizer's profile with a freshly
    /// allocated id, applying the form.
    ///
    /// A new conference starts with every seat available.
    pub fn create(
        id: u64,
        organizer_user_id: impl Into<String>,
        form: &ConferenceForm,
    ) -> Result<Self> {
        let mut conference = Self {
            id,
            organizer_user_id: organizer_user_id.into(),
            name: String::new(),
            description: None,
            topics: Vec::new(),
            city: String::new(),
            start_date: None,
            end_date: None,
            month: 0,
            max_attendees: 0,
            seats_available: 0,
        };
        conference.apply_form(form)?;
        Ok(conference)
    }

    /// Apply a new form to this conference.
    ///
    /// The allocated-seats count survives a capacity change: after setting
    /// a new `max_attendees`, availability is recomputed so that
    /// `max_attendees - seats_available` is unchanged. A capacity below the
    /// allocated count is rejected, and a rejected form leaves the
    /// aggregate untouched.
    pub fn apply_form(&mut self, form: &ConferenceForm) -> Result<()> {
        let name = form
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ConferenceError::new(ErrorCode::MissingRequiredField, "The name is required")
            })?;

        let seats_allocated = self.seats_allocated();
        if form.max_attendees < seats_allocated {
            return Err(ConferenceError::new(
                ErrorCode::CapacityBelowAllocation,
                format!(
                    "{} seats are already allocated, but maxAttendees was set to {}",
                    seats_allocated, form.max_attendees
                ),
            ));
        }

        self.name = name.to_string();
        self.description = form.description.clone();
        self.topics = match &form.topics {
            Some(topics) if !topics.is_empty() => topics.clone(),
            _ => DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        };
        self.city = form.city.clone().unwrap_or_else(|| DEFAULT_CITY.to_string());
        self.start_date = form.start_date;
        self.end_date = form.end_date;
        // Derived: 1-based calendar month of the start date, 0 when unset.
        self.month = self.start_date.map(|date| date.month()).unwrap_or(0);
        self.max_attendees = form.max_attendees;
        self.seats_available = self.max_attendees - seats_allocated;
        Ok(())
    }

    /// Take `number` seats out of the available pool.
    pub fn book_seats(&mut self, number: u32) -> Result<()> {
        if number == 0 {
            return Err(ConferenceError::validation(
                "The number of seats must be positive",
            ));
        }
        if self.seats_available < number {
            return Err(ConferenceError::new(
                ErrorCode::NoSeatsAvailable,
                "There are no seats available",
            ));
        }
        self.seats_available -= number;
        Ok(())
    }

    /// Return `number` seats to the available pool.
    pub fn give_back_seats(&mut self, number: u32) -> Result<()> {
        if number == 0 {
            return Err(ConferenceError::validation(
                "The number of seats must be positive",
            ));
        }
        let exceeds = self
            .seats_available
            .checked_add(number)
            .map_or(true, |total| total > self.max_attendees);
        if exceeds {
            return Err(ConferenceError::new(
                ErrorCode::ExceedsCapacity,
                "The number of seats would exceed the capacity",
            ));
        }
        self.seats_available += number;
        Ok(())
    }

    /// Seats currently taken out of the pool.
    pub fn seats_allocated(&self) -> u32 {
        self.max_attendees - self.seats_available
    }

    /// The organizer's display name, falling back to the opaque user id
    /// when the profile is absent.
    pub fn organizer_display_name(&self, organizer: Option<&Profile>) -> String {
        match organizer {
            Some(profile) => profile.display_name().to_string(),
            None => self.organizer_user_id.clone(),
        }
    }

    /// Full entity key: `(Profile, organizer) / (Conference, id)`.
    pub fn key(&self) -> Key {
        Key::conference(&self.organizer_user_id, self.id)
    }

    /// Key of the owning profile.
    pub fn profile_key(&self) -> Key {
        Key::profile(&self.organizer_user_id)
    }

    /// URL-safe string form of this conference's key.
    pub fn websafe_key(&self) -> Result<String> {
        self.key().websafe()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn organizer_user_id(&self) -> &str {
        &self.organizer_user_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// 1-based calendar month of the start date; 0 when no start date.
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn max_attendees(&self) -> u32 {
        self.max_attendees
    }

    pub fn seats_available(&self) -> u32 {
        self.seats_available
    }
}
