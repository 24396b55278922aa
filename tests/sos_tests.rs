//! Integration tests for SOS dispatch:
//!
//! - Activation always resolves some location and inserts exactly one row.
//! - Cancellation is a status transition, never a delete.
//! - The confirmation text names at most three contacts.

use hilltop::geo::Point;
use hilltop::sos::{self, FixError, FixProvider, NoFix, SOS_FALLBACK_POINT};
use hilltop::storage::{now_secs, ProfileRow, Storage};

fn setup_user(storage: &Storage, id: &str) {
    storage
        .upsert_profile(&ProfileRow {
            id: id.to_string(),
            email: Some(format!("{id}@school.edu")),
            display_name: None,
            photo_url: None,
            provider: "clerk".to_string(),
            tracking_code: None,
            updated_at: now_secs(),
        })
        .unwrap();
}

struct FixedFix(Point);

impl FixProvider for FixedFix {
    fn current_fix(&self) -> Result<Point, FixError> {
        Ok(self.0)
    }
}

struct DeniedFix;

impl FixProvider for DeniedFix {
    fn current_fix(&self) -> Result<Point, FixError> {
        Err(FixError::PermissionDenied)
    }
}

#[test]
fn activation_with_no_location_uses_the_fallback() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    let activation = sos::activate(&storage, "alice", None, &NoFix, "Help!").unwrap();
    assert_eq!(activation.location.latitude, SOS_FALLBACK_POINT.latitude);
    assert_eq!(activation.location.longitude, SOS_FALLBACK_POINT.longitude);
    assert_eq!(activation.contact_count, 0);

    let alerts = sos::list_active(&storage, "alice").unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].status, "active");
    assert_eq!(alerts[0].message, "Help!");
}

#[test]
fn last_known_location_wins_over_a_fresh_fix() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    let last_known = Point::new(14.70, 121.05);
    let fix = FixedFix(Point::new(10.0, 120.0));
    let activation =
        sos::activate(&storage, "alice", Some(last_known), &fix, "Help!").unwrap();
    assert_eq!(activation.location.latitude, 14.70);
    assert_eq!(activation.location.longitude, 121.05);
}

#[test]
fn fresh_fix_is_used_when_no_last_known() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    let fix = FixedFix(Point::new(14.71, 121.06));
    let activation = sos::activate(&storage, "alice", None, &fix, "Help!").unwrap();
    assert_eq!(activation.location.latitude, 14.71);

    // A denied fix falls back instead of failing the activation.
    let activation = sos::activate(&storage, "alice", None, &DeniedFix, "Help!").unwrap();
    assert_eq!(activation.location.latitude, SOS_FALLBACK_POINT.latitude);
}

#[test]
fn cancel_transitions_status_without_deleting() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    let activation = sos::activate(&storage, "alice", None, &NoFix, "Help!").unwrap();
    sos::cancel(&storage, activation.alert_id).unwrap();

    assert!(sos::list_active(&storage, "alice").unwrap().is_empty());
    let row = storage.get_sos_alert(activation.alert_id).unwrap().unwrap();
    assert_eq!(row.status, "cancelled");
}

#[test]
fn each_activation_inserts_exactly_one_row() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    sos::activate(&storage, "alice", None, &NoFix, "Help!").unwrap();
    sos::activate(&storage, "alice", None, &NoFix, "Help again!").unwrap();
    assert_eq!(sos::list_active(&storage, "alice").unwrap().len(), 2);
}

#[test]
fn confirmation_names_at_most_three_contacts() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");
    for name in ["Mom", "Dad", "Kuya", "Ate"] {
        storage
            .insert_contact("alice", name, "09170000000", None)
            .unwrap();
    }

    let activation = sos::activate(&storage, "alice", None, &NoFix, "Help!").unwrap();
    assert_eq!(activation.contact_count, 4);

    let message = sos::confirmation_message(&activation);
    assert!(message.contains("Emergency contacts (4):"));
    assert!(message.ends_with("Please contact them directly if you need immediate help."));
    // Newest-first listing, capped at three names plus an ellipsis.
    assert!(message.contains("Ate, Kuya, Dad..."));
    assert!(!message.contains("Mom"));
}

#[test]
fn confirmation_without_contacts_points_at_setup() {
    let storage = Storage::open_in_memory().unwrap();
    setup_user(&storage, "alice");

    let activation = sos::activate(&storage, "alice", None, &NoFix, "Help!").unwrap();
    let message = sos::confirmation_message(&activation);
    assert!(message.contains("No emergency contacts set up"));
}
