//! In-memory entity-group datastore.
//!
//! Entities are grouped by the root of their key path; each group carries a
//! version that bumps on every committed write. Entity-group transactions
//! snapshot a group, run the caller's body against the snapshot, and commit
//! only if the version is unchanged (optimistic concurrency); losers back
//! off and retry up to the configured attempt bound. Ancestor-scoped reads
//! are strongly consistent. The global conference scan stands in for an
//! eventually-consistent cross-group index and makes no freshness promise
//! beyond the moment the read lock is held.

use std::collections::BTreeMap;

use dashmap::DashMap;
use metrics::counter;
use parking_lot::RwLock;

use crate::conference::Conference;
use crate::config::DatastoreConfig;
use crate::error::{ConferenceError, Result};
use crate::profile::Profile;

use super::key::{Key, CONFERENCE_KIND, PROFILE_KIND};

// ═══════════════════════════════════════════════════════════════════════════════
// Entities
// ═══════════════════════════════════════════════════════════════════════════════

/// A persistable aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Profile(Profile),
    Conference(Conference),
}

impl Entity {
    /// Full key of this entity.
    pub fn key(&self) -> Key {
        match self {
            Self::Profile(profile) => Key::profile(profile.user_id()),
            Self::Conference(conference) => conference.key(),
        }
    }

    /// Key of the entity group this entity belongs to.
    pub fn root_key(&self) -> Key {
        self.key().root()
    }

    pub fn as_profile(&self) -> Option<&Profile> {
        match self {
            Self::Profile(profile) => Some(profile),
            _ => None,
        }
    }

    pub fn as_conference(&self) -> Option<&Conference> {
        match self {
            Self::Conference(conference) => Some(conference),
            _ => None,
        }
    }
}

/// One entity group: a version counter plus the entities under one root.
#[derive(Debug, Clone, Default)]
struct EntityGroup {
    version: u64,
    entities: BTreeMap<Key, Entity>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Transactions
// ═══════════════════════════════════════════════════════════════════════════════

/// An in-flight entity-group transaction.
///
/// Reads come from the snapshot taken when the transaction started; writes
/// are staged and applied atomically at commit. A transaction may only
/// touch entities of its own group.
pub struct Transaction {
    root: Key,
    snapshot: BTreeMap<Key, Entity>,
    writes: Vec<Entity>,
}

impl Transaction {
    /// Load a profile from the transaction snapshot.
    pub fn load_profile(&self, user_id: &str) -> Option<Profile> {
        let key = Key::profile(user_id);
        self.snapshot
            .get(&key)
            .and_then(Entity::as_profile)
            .cloned()
    }

    /// Load a conference from the transaction snapshot.
    pub fn load_conference(&self, key: &Key) -> Option<Conference> {
        self.snapshot
            .get(key)
            .and_then(Entity::as_conference)
            .cloned()
    }

    /// Stage an entity write for commit.
    pub fn save(&mut self, entity: Entity) -> Result<()> {
        if entity.root_key() != self.root {
            return Err(ConferenceError::validation(
                "Transactions may only write entities of their own entity group",
            )
            .with_context("group", self.root.to_string())
            .with_context("entity", entity.key().to_string()));
        }
        self.writes.push(entity);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Datastore
// ═══════════════════════════════════════════════════════════════════════════════

/// The bundled strongly-consistent datastore backend.
pub struct Datastore {
    groups: RwLock<BTreeMap<Key, EntityGroup>>,
    id_counters: DashMap<Key, u64>,
    config: DatastoreConfig,
}

impl Datastore {
    pub fn new(config: DatastoreConfig) -> Self {
        Self {
            groups: RwLock::new(BTreeMap::new()),
            id_counters: DashMap::new(),
            config,
        }
    }

    /// A datastore with the default retry policy (tests, local runs).
    pub fn with_defaults() -> Self {
        Self::new(DatastoreConfig::default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Id allocation
    // ─────────────────────────────────────────────────────────────────────────

    /// Allocate a fresh conference id under the given parent profile key.
    ///
    /// Ids are unique within the parent and start at 1. An allocated id is
    /// never reissued, whether or not the conference commits.
    pub async fn allocate_conference_id(&self, parent: &Key) -> Result<u64> {
        let mut counter = self.id_counters.entry(parent.root()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Point loads
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn load_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let key = Key::profile(user_id);
        let groups = self.groups.read();
        Ok(groups
            .get(&key)
            .and_then(|group| group.entities.get(&key))
            .and_then(Entity::as_profile)
            .cloned())
    }

    pub async fn load_conference(&self, key: &Key) -> Result<Option<Conference>> {
        if key.kind() != CONFERENCE_KIND {
            return Err(ConferenceError::invalid_key("Not a conference key")
                .with_context("key", key.to_string()));
        }
        let groups = self.groups.read();
        Ok(groups
            .get(&key.root())
            .and_then(|group| group.entities.get(key))
            .and_then(Entity::as_conference)
            .cloned())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Saves
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist one or more entities.
    ///
    /// Entities sharing a root commit atomically under a single group
    /// version bump; entities of different roots commit independently.
    pub async fn save_all(&self, entities: Vec<Entity>) -> Result<()> {
        let mut by_root: BTreeMap<Key, Vec<Entity>> = BTreeMap::new();
        for entity in entities {
            by_root.entry(entity.root_key()).or_default().push(entity);
        }

        let mut groups = self.groups.write();
        for (root, batch) in by_root {
            let group = groups.entry(root).or_default();
            for entity in batch {
                group.entities.insert(entity.key(), entity);
            }
            group.version += 1;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// All conferences, ordered by name ascending (raw lexicographic), ties
    /// broken by id ascending.
    pub async fn query_conferences(&self) -> Result<Vec<Conference>> {
        let groups = self.groups.read();
        let mut conferences: Vec<Conference> = groups
            .values()
            .flat_map(|group| group.entities.values())
            .filter_map(Entity::as_conference)
            .cloned()
            .collect();
        drop(groups);

        sort_by_name(&mut conferences);
        Ok(conferences)
    }

    /// Conferences under one profile, strongly consistent, same ordering as
    /// [`Self::query_conferences`].
    pub async fn query_conferences_by_organizer(&self, profile_key: &Key) -> Result<Vec<Conference>> {
        if profile_key.kind() != PROFILE_KIND {
            return Err(ConferenceError::invalid_key("Not a profile key")
                .with_context("key", profile_key.to_string()));
        }

        let groups = self.groups.read();
        let mut conferences: Vec<Conference> = groups
            .get(&profile_key.root())
            .into_iter()
            .flat_map(|group| group.entities.values())
            .filter_map(Entity::as_conference)
            .cloned()
            .collect();
        drop(groups);

        sort_by_name(&mut conferences);
        Ok(conferences)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Run `body` in an entity-group transaction on `root`'s group.
    ///
    /// The body reads a consistent snapshot and stages writes through the
    /// [`Transaction`]. Commit succeeds only if the group version is the
    /// one the snapshot saw; otherwise the body is re-run against fresh
    /// state after an exponential backoff, up to the configured attempt
    /// bound, and retry exhaustion surfaces `TransactionConflict`. Errors
    /// returned by the body abort the transaction immediately and are
    /// never retried.
    pub async fn run_in_transaction<T, F>(&self, root: &Key, mut body: F) -> Result<T>
    where
        F: FnMut(&mut Transaction) -> Result<T>,
    {
        let root = root.root();
        let max_attempts = self.config.transaction_max_attempts.max(1);
        let mut delay = self.config.transaction_retry_delay;

        for attempt in 1..=max_attempts {
            let (snapshot, version) = {
                let groups = self.groups.read();
                match groups.get(&root) {
                    Some(group) => (group.entities.clone(), group.version),
                    None => (BTreeMap::new(), 0),
                }
            };

            let mut tx = Transaction {
                root: root.clone(),
                snapshot,
                writes: Vec::new(),
            };
            let value = body(&mut tx)?;

            if tx.writes.is_empty() {
                return Ok(value);
            }

            let committed = {
                let mut groups = self.groups.write();
                let group = groups.entry(root.clone()).or_default();
                if group.version == version {
                    for entity in tx.writes.drain(..) {
                        group.entities.insert(entity.key(), entity);
                    }
                    group.version += 1;
                    true
                } else {
                    false
                }
            };

            if committed {
                return Ok(value);
            }

            counter!("conference_transaction_retries_total").increment(1);
            tracing::debug!(
                group = %root,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Entity-group transaction conflict, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(self.config.transaction_retry_delay_cap);
        }

        Err(ConferenceError::conflict("Lost to concurrent updates, please retry")
            .with_context("group", root.to_string())
            .with_context("attempts", max_attempts))
    }
}

/// Name ascending, raw lexicographic, id ascending on ties.
fn sort_by_name(conferences: &mut [Conference]) {
    conferences.sort_by(|a, b| {
        a.name()
            .cmp(b.name())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conference::ConferenceForm;

    fn conference(user_id: &str, id: u64, name: &str) -> Conference {
        let form = ConferenceForm {
            name: Some(name.to_string()),
            max_attendees: 10,
            ..Default::default()
        };
        Conference::create(id, user_id, &form).unwrap()
    }

    #[test]
    fn test_id_allocation_is_per_parent() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let u1 = Key::profile("u1");
            let u2 = Key::profile("u2");

            assert_eq!(store.allocate_conference_id(&u1).await.unwrap(), 1);
            assert_eq!(store.allocate_conference_id(&u1).await.unwrap(), 2);
            assert_eq!(store.allocate_conference_id(&u2).await.unwrap(), 1);
        });
    }

    #[test]
    fn test_save_all_same_root_bumps_version_once() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let profile = Profile::new("u1", None, "u1@example.com", None);

            store
                .save_all(vec![
                    Entity::Profile(profile),
                    Entity::Conference(conference("u1", 1, "Alpha")),
                ])
                .await
                .unwrap();

            let groups = store.groups.read();
            let group = groups.get(&Key::profile("u1")).unwrap();
            assert_eq!(group.version, 1);
            assert_eq!(group.entities.len(), 2);
        });
    }

    #[test]
    fn test_load_round_trip() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let stored = conference("u1", 1, "Alpha");
            store
                .save_all(vec![Entity::Conference(stored.clone())])
                .await
                .unwrap();

            let loaded = store.load_conference(&stored.key()).await.unwrap().unwrap();
            assert_eq!(loaded, stored);
            assert!(store.load_profile("u1").await.unwrap().is_none());
        });
    }

    #[test]
    fn test_load_conference_rejects_profile_key() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            assert!(store.load_conference(&Key::profile("u1")).await.is_err());
        });
    }

    #[test]
    fn test_query_ordering_name_then_id() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            store
                .save_all(vec![
                    Entity::Conference(conference("u1", 2, "Bravo")),
                    Entity::Conference(conference("u1", 3, "Alpha")),
                    Entity::Conference(conference("u2", 1, "Alpha")),
                ])
                .await
                .unwrap();

            let all = store.query_conferences().await.unwrap();
            let listing: Vec<(String, u64)> = all
                .iter()
                .map(|c| (c.name().to_string(), c.id()))
                .collect();
            assert_eq!(
                listing,
                vec![
                    ("Alpha".to_string(), 1),
                    ("Alpha".to_string(), 3),
                    ("Bravo".to_string(), 2),
                ]
            );
        });
    }

    #[test]
    fn test_transaction_commits_staged_writes() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let root = Key::profile("u1");

            let saved = store
                .run_in_transaction(&root, |tx| {
                    let c = conference("u1", 1, "Alpha");
                    tx.save(Entity::Conference(c.clone()))?;
                    Ok(c)
                })
                .await
                .unwrap();

            let loaded = store.load_conference(&saved.key()).await.unwrap();
            assert_eq!(loaded, Some(saved));
        });
    }

    #[test]
    fn test_transaction_rejects_cross_group_write() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let root = Key::profile("u1");

            let result = store
                .run_in_transaction(&root, |tx| {
                    tx.save(Entity::Conference(conference("u2", 1, "Alpha")))?;
                    Ok(())
                })
                .await;
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_transaction_conflict_exhaustion() {
        tokio_test::block_on(async {
            let config = DatastoreConfig {
                transaction_max_attempts: 3,
                transaction_retry_delay: std::time::Duration::from_millis(1),
                transaction_retry_delay_cap: std::time::Duration::from_millis(2),
            };
            let store = Datastore::new(config);
            let root = Key::profile("u1");

            // Every attempt loses: the body itself advances the group
            // version before commit.
            let result = store
                .run_in_transaction(&root, |tx| {
                    {
                        let mut groups = store.groups.write();
                        groups.entry(root.clone()).or_default().version += 1;
                    }
                    tx.save(Entity::Conference(conference("u1", 1, "Alpha")))?;
                    Ok(())
                })
                .await;

            let err = result.unwrap_err();
            assert_eq!(err.code(), crate::error::ErrorCode::TransactionConflict);
        });
    }

    #[test]
    fn test_transaction_retries_after_interleaved_commit() {
        tokio_test::block_on(async {
            let store = Datastore::with_defaults();
            let root = Key::profile("u1");
            store
                .save_all(vec![Entity::Conference(conference("u1", 1, "Alpha"))])
                .await
                .unwrap();

            // First attempt races with an external commit; the body must
            // re-run and observe the new name.
            let mut attempts = 0;
            let observed = store
                .run_in_transaction(&root, |tx| {
                    attempts += 1;
                    if attempts == 1 {
                        // Simulate a concurrent writer between snapshot and commit.
                        let mut groups = store.groups.write();
                        let group = groups.get_mut(&root).unwrap();
                        let renamed = conference("u1", 1, "Renamed");
                        group.entities.insert(renamed.key(), Entity::Conference(renamed));
                        group.version += 1;
                    }
                    let current = tx.load_conference(&Key::conference("u1", 1)).unwrap();
                    tx.save(Entity::Conference(current.clone()))?;
                    Ok(current.name().to_string())
                })
                .await
                .unwrap();

            assert_eq!(attempts, 2);
            assert_eq!(observed, "Renamed");
        });
    }
}
