//! Integration tests for the Conference service.
//!
//! These tests verify end-to-end functionality across modules: identity,
//! aggregates, datastore transactions, and the service operations.

use std::sync::Arc;

use chrono::NaiveDate;
use conference_core::api::ConferenceService;
use conference_core::conference::ConferenceForm;
use conference_core::datastore::Datastore;
use conference_core::error::ErrorCode;
use conference_core::identity::Identity;
use conference_core::profile::{ProfileForm, TeeShirtSize};

// ============================================================================
// Test Utilities
// ============================================================================

fn service() -> ConferenceService {
    ConferenceService::new(Arc::new(Datastore::with_defaults()))
}

fn lemoncake() -> Identity {
    Identity::new("u1", "lemoncake@example.com")
}

fn conference_form(name: &str, max_attendees: u32) -> ConferenceForm {
    ConferenceForm {
        name: Some(name.to_string()),
        max_attendees,
        ..Default::default()
    }
}

// ============================================================================
// Profile Scenarios
// ============================================================================

#[tokio::test]
async fn test_save_profile_defaults_display_name_from_email() {
    let service = service();

    let profile = service
        .save_profile(&lemoncake(), ProfileForm::default())
        .await
        .unwrap();

    assert_eq!(profile.user_id(), "u1");
    assert_eq!(profile.display_name(), "lemoncake");
    assert_eq!(profile.main_email(), "lemoncake@example.com");
    assert_eq!(profile.tee_shirt_size(), TeeShirtSize::NotSpecified);
}

#[tokio::test]
async fn test_save_profile_twice_updates_in_place() {
    let service = service();
    let caller = lemoncake();

    service
        .save_profile(&caller, ProfileForm::default())
        .await
        .unwrap();

    let form = ProfileForm {
        display_name: Some("Lemon Cake".into()),
        tee_shirt_size: Some(TeeShirtSize::Xl),
    };
    let updated = service.save_profile(&caller, form).await.unwrap();

    assert_eq!(updated.display_name(), "Lemon Cake");
    assert_eq!(updated.tee_shirt_size(), TeeShirtSize::Xl);
    // Email never changes after creation.
    assert_eq!(updated.main_email(), "lemoncake@example.com");

    let loaded = service.get_profile(&caller).await.unwrap().unwrap();
    assert_eq!(loaded, updated);
}

#[tokio::test]
async fn test_get_profile_is_none_before_first_save() {
    let service = service();
    assert!(service.get_profile(&lemoncake()).await.unwrap().is_none());
}

// ============================================================================
// Conference Creation
// ============================================================================

#[tokio::test]
async fn test_create_conference_applies_defaults_and_opens_all_seats() {
    let service = service();

    let form = ConferenceForm {
        name: Some("DevCon".into()),
        topics: Some(vec![]),
        city: None,
        start_date: NaiveDate::from_ymd_opt(2024, 3, 15),
        max_attendees: 100,
        ..Default::default()
    };
    let conference = service
        .create_conference(&lemoncake(), form)
        .await
        .unwrap();

    assert_eq!(conference.name(), "DevCon");
    assert_eq!(conference.topics(), ["Default", "Topic"]);
    assert_eq!(conference.city(), "Default City");
    assert_eq!(conference.month(), 3);
    assert_eq!(conference.max_attendees(), 100);
    assert_eq!(conference.seats_available(), 100);
    assert_eq!(conference.organizer_user_id(), "u1");

    // The caller's profile was created alongside, with defaulted fields.
    let profile = service.get_profile(&lemoncake()).await.unwrap().unwrap();
    assert_eq!(profile.display_name(), "lemoncake");

    // And the organizer name resolves through it.
    let display_name = service.organizer_display_name(&conference).await.unwrap();
    assert_eq!(display_name, "lemoncake");
}

#[tokio::test]
async fn test_create_conference_keeps_existing_profile() {
    let service = service();
    let caller = lemoncake();

    let form = ProfileForm {
        display_name: Some("Lemon Cake".into()),
        tee_shirt_size: Some(TeeShirtSize::M),
    };
    service.save_profile(&caller, form).await.unwrap();

    service
        .create_conference(&caller, conference_form("DevCon", 10))
        .await
        .unwrap();

    let profile = service.get_profile(&caller).await.unwrap().unwrap();
    assert_eq!(profile.display_name(), "Lemon Cake");
    assert_eq!(profile.tee_shirt_size(), TeeShirtSize::M);
}

#[tokio::test]
async fn test_create_conference_without_name_persists_nothing() {
    let service = service();
    let caller = lemoncake();

    let err = service
        .create_conference(&caller, ConferenceForm::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::MissingRequiredField);

    // The aborted transaction left neither the conference nor the profile.
    assert!(service.query_conferences().await.unwrap().is_empty());
    assert!(service.get_profile(&caller).await.unwrap().is_none());
}

#[tokio::test]
async fn test_conference_ids_are_sequential_per_organizer() {
    let service = service();
    let caller = lemoncake();

    let first = service
        .create_conference(&caller, conference_form("Alpha", 10))
        .await
        .unwrap();
    let second = service
        .create_conference(&caller, conference_form("Bravo", 10))
        .await
        .unwrap();

    assert_eq!(first.id(), 1);
    assert_eq!(second.id(), 2);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_is_name_ordered_and_ancestor_scoped() {
    let service = service();
    let u1 = lemoncake();
    let u2 = Identity::new("u2", "pat@example.com");

    service
        .create_conference(&u1, conference_form("Bravo", 10))
        .await
        .unwrap();
    service
        .create_conference(&u1, conference_form("Alpha", 10))
        .await
        .unwrap();
    service
        .create_conference(&u2, conference_form("Charlie", 10))
        .await
        .unwrap();

    let mine = service.conferences_created_by(&u1).await.unwrap();
    let names: Vec<&str> = mine.iter().map(|c| c.name()).collect();
    assert_eq!(names, ["Alpha", "Bravo"]);

    let all = service.query_conferences().await.unwrap();
    let names: Vec<&str> = all.iter().map(|c| c.name()).collect();
    assert_eq!(names, ["Alpha", "Bravo", "Charlie"]);
}

// ============================================================================
// Seat Accounting Under Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_bookings_admit_exactly_one_winner() {
    let service = Arc::new(service());
    let conference = service
        .create_conference(&lemoncake(), conference_form("DevCon", 10))
        .await
        .unwrap();
    let key = conference.key();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let service = Arc::clone(&service);
        let key = key.clone();
        handles.push(tokio::spawn(
            async move { service.book_seats(&key, 6).await },
        ));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(updated) => {
                successes += 1;
                assert_eq!(updated.seats_available(), 4);
            }
            Err(err) => assert_eq!(err.code(), ErrorCode::NoSeatsAvailable),
        }
    }
    assert_eq!(successes, 1);

    let final_state = service.query_conferences().await.unwrap().remove(0);
    assert_eq!(final_state.seats_available(), 4);
}

#[tokio::test]
async fn test_booked_seats_can_be_given_back() {
    let service = service();
    let conference = service
        .create_conference(&lemoncake(), conference_form("DevCon", 10))
        .await
        .unwrap();
    let key = conference.key();

    service.book_seats(&key, 6).await.unwrap();
    let restored = service.give_back_seats(&key, 2).await.unwrap();
    assert_eq!(restored.seats_available(), 6);

    let err = service.give_back_seats(&key, 5).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ExceedsCapacity);
}

// ============================================================================
// Capacity Changes Through the Service
// ============================================================================

#[tokio::test]
async fn test_capacity_shrink_through_update() {
    let service = service();
    let conference = service
        .create_conference(&lemoncake(), conference_form("DevCon", 100))
        .await
        .unwrap();
    let key = conference.key();

    service.book_seats(&key, 60).await.unwrap();

    let updated = service
        .update_conference(&key, conference_form("DevCon", 60))
        .await
        .unwrap();
    assert_eq!(updated.seats_available(), 0);
    assert_eq!(updated.seats_allocated(), 60);

    let err = service
        .update_conference(&key, conference_form("DevCon", 59))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::CapacityBelowAllocation);
}
