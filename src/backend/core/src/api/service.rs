//! Service operations behind the HTTP surface.
//!
//! Each operation receives an already-resolved caller identity, loads or
//! constructs the aggregates it needs, lets them validate themselves, and
//! commits through the datastore. Seat arithmetic and capacity changes
//! always run inside an entity-group transaction so the rules apply to
//! freshly loaded state rather than whatever the caller last saw.

use std::sync::Arc;

use metrics::counter;

use crate::conference::{Conference, ConferenceForm};
use crate::datastore::key::Key;
use crate::datastore::{Datastore, Entity};
use crate::error::{ConferenceError, Result};
use crate::identity::Identity;
use crate::profile::{Profile, ProfileForm};

/// Orchestrates aggregate loads, mutations, and commits.
#[derive(Clone)]
pub struct ConferenceService {
    datastore: Arc<Datastore>,
}

impl ConferenceService {
    pub fn new(datastore: Arc<Datastore>) -> Self {
        Self { datastore }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Profiles
    // ─────────────────────────────────────────────────────────────────────────

    /// Create or update the caller's profile.
    pub async fn save_profile(&self, caller: &Identity, form: ProfileForm) -> Result<Profile> {
        let profile = match self.datastore.load_profile(&caller.user_id).await? {
            None => {
                tracing::info!(user_id = %caller.user_id, "Creating new profile");
                Profile::new(
                    &caller.user_id,
                    form.display_name,
                    &caller.email,
                    form.tee_shirt_size,
                )
            }
            Some(mut profile) => {
                profile.update(form.display_name, form.tee_shirt_size);
                profile
            }
        };

        self.datastore
            .save_all(vec![Entity::Profile(profile.clone())])
            .await?;
        Ok(profile)
    }

    /// The caller's profile, if one has been saved.
    pub async fn get_profile(&self, caller: &Identity) -> Result<Option<Profile>> {
        self.datastore.load_profile(&caller.user_id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conferences
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a conference under the caller's profile.
    ///
    /// The profile is created with defaults when the caller has never
    /// saved one; profile and conference commit in a single transaction on
    /// the caller's entity group.
    pub async fn create_conference(
        &self,
        caller: &Identity,
        form: ConferenceForm,
    ) -> Result<Conference> {
        let profile_key = Key::profile(&caller.user_id);
        let conference_id = self.datastore.allocate_conference_id(&profile_key).await?;

        let user_id = caller.user_id.clone();
        let email = caller.email.clone();
        let conference = self
            .datastore
            .run_in_transaction(&profile_key, |tx| {
                let profile = tx
                    .load_profile(&user_id)
                    .unwrap_or_else(|| Profile::new(&user_id, None, &email, None));
                let conference = Conference::create(conference_id, &user_id, &form)?;
                tx.save(Entity::Profile(profile))?;
                tx.save(Entity::Conference(conference.clone()))?;
                Ok(conference)
            })
            .await?;

        counter!("conference_created_total").increment(1);
        tracing::info!(
            conference_id = conference.id(),
            organizer = %caller.user_id,
            name = conference.name(),
            "Conference created"
        );
        Ok(conference)
    }

    /// All conferences, name-ordered. No caller required.
    pub async fn query_conferences(&self) -> Result<Vec<Conference>> {
        self.datastore.query_conferences().await
    }

    /// Conferences organized by the caller, name-ordered.
    pub async fn conferences_created_by(&self, caller: &Identity) -> Result<Vec<Conference>> {
        self.datastore
            .query_conferences_by_organizer(&Key::profile(&caller.user_id))
            .await
    }

    /// Apply a new form to an existing conference.
    ///
    /// Runs in a transaction on the conference's group so the capacity
    /// rule is checked against the committed seat allocation.
    pub async fn update_conference(
        &self,
        conference_key: &Key,
        form: ConferenceForm,
    ) -> Result<Conference> {
        let key = conference_key.clone();
        self.datastore
            .run_in_transaction(&conference_key.root(), move |tx| {
                let mut conference = tx
                    .load_conference(&key)
                    .ok_or_else(|| ConferenceError::not_found("Conference", key.to_string()))?;
                conference.apply_form(&form)?;
                tx.save(Entity::Conference(conference.clone()))?;
                Ok(conference)
            })
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seat accounting
    // ─────────────────────────────────────────────────────────────────────────

    /// Transactionally take `number` seats from a conference's pool.
    ///
    /// Contending bookings serialize on the conference's entity group; a
    /// loser re-runs against the winner's committed state, so overselling
    /// cannot happen.
    pub async fn book_seats(&self, conference_key: &Key, number: u32) -> Result<Conference> {
        let key = conference_key.clone();
        let conference = self
            .datastore
            .run_in_transaction(&conference_key.root(), move |tx| {
                let mut conference = tx
                    .load_conference(&key)
                    .ok_or_else(|| ConferenceError::not_found("Conference", key.to_string()))?;
                conference.book_seats(number)?;
                tx.save(Entity::Conference(conference.clone()))?;
                Ok(conference)
            })
            .await?;

        counter!("conference_seats_booked_total").increment(u64::from(number));
        Ok(conference)
    }

    /// Transactionally return `number` seats to a conference's pool.
    pub async fn give_back_seats(&self, conference_key: &Key, number: u32) -> Result<Conference> {
        let key = conference_key.clone();
        let conference = self
            .datastore
            .run_in_transaction(&conference_key.root(), move |tx| {
                let mut conference = tx
                    .load_conference(&key)
                    .ok_or_else(|| ConferenceError::not_found("Conference", key.to_string()))?;
                conference.give_back_seats(number)?;
                tx.save(Entity::Conference(conference.clone()))?;
                Ok(conference)
            })
            .await?;

        counter!("conference_seats_returned_total").increment(u64::from(number));
        Ok(conference)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Read-side helpers
    // ─────────────────────────────────────────────────────────────────────────

    /// Display name of a conference's organizer, falling back to the
    /// opaque user id when the profile has never been saved.
    pub async fn organizer_display_name(&self, conference: &Conference) -> Result<String> {
        let organizer = self
            .datastore
            .load_profile(conference.organizer_user_id())
            .await?;
        Ok(conference.organizer_display_name(organizer.as_ref()))
    }
}
