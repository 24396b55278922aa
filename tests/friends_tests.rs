//! Integration tests for tracking codes and the mutual friendship flow:
//!
//! - Codes are assigned lazily, are immutable, and collisions are retried
//!   up to a bounded cap.
//! - Adding by code creates both directed edges and grants visibility in
//!   both directions.
//! - Removal is one-sided; the other party keeps their edge until they
//!   remove it themselves.

use hilltop::friends::{self, FriendError};
use hilltop::storage::{now_secs, ProfileRow, Storage};

fn profile(id: &str, email: &str, name: Option<&str>) -> ProfileRow {
    ProfileRow {
        id: id.to_string(),
        email: Some(email.to_string()),
        display_name: name.map(str::to_string),
        photo_url: None,
        provider: "clerk".to_string(),
        tracking_code: None,
        updated_at: now_secs(),
    }
}

fn setup_two_users() -> Storage {
    let storage = Storage::open_in_memory().unwrap();
    storage
        .upsert_profile(&profile("alice", "alice@school.edu", Some("Alice Cruz")))
        .unwrap();
    storage
        .upsert_profile(&profile("bob", "bob@school.edu", Some("Bob Reyes")))
        .unwrap();
    storage
}

#[test]
fn add_by_code_creates_mutual_edges_and_visibility() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "X7K9QP").unwrap();

    let added = friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap();
    assert_eq!(added.friend.id, "bob");
    assert_eq!(
        added.message,
        "Now tracking Bob Reyes. They can also see your location."
    );

    // Both directed edges exist.
    assert!(storage.get_friend_edge("alice", "bob").unwrap().is_some());
    assert!(storage.get_friend_edge("bob", "alice").unwrap().is_some());

    // Both allow-lists include the other party.
    let alice_loc = storage.get_location("alice").unwrap().unwrap();
    let bob_loc = storage.get_location("bob").unwrap().unwrap();
    assert!(alice_loc.shared_with.contains(&"bob".to_string()));
    assert!(bob_loc.shared_with.contains(&"alice".to_string()));

    // New rows have no coordinates until the owner captures a fix.
    assert!(bob_loc.latitude.is_none());
    assert!(bob_loc.longitude.is_none());
}

#[test]
fn code_lookup_normalizes_case_and_whitespace() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "X7K9QP").unwrap();

    let added = friends::add_friend_by_code(&storage, "alice", "  x7k9qp ").unwrap();
    assert_eq!(added.friend.id, "bob");
}

#[test]
fn unknown_code_is_code_not_found() {
    let storage = setup_two_users();
    let err = friends::add_friend_by_code(&storage, "alice", "ZZZZZZ").unwrap_err();
    assert!(matches!(err, FriendError::CodeNotFound));
}

#[test]
fn own_code_is_rejected() {
    let storage = setup_two_users();
    storage.set_tracking_code("alice", "AAAAAA").unwrap();

    let err = friends::add_friend_by_code(&storage, "alice", "AAAAAA").unwrap_err();
    assert!(matches!(err, FriendError::SelfAdd));
}

#[test]
fn double_add_is_already_tracking() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "X7K9QP").unwrap();

    friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap();
    let err = friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap_err();
    assert!(matches!(err, FriendError::AlreadyTracking));

    // The original relationship is untouched.
    assert_eq!(friends::get_friends(&storage, "alice").unwrap().len(), 1);
}

#[test]
fn code_assignment_is_stable_across_calls() {
    let storage = setup_two_users();

    let first = friends::get_or_create_tracking_code(&storage, "alice").unwrap();
    let second = friends::get_or_create_tracking_code(&storage, "alice").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 6);
    assert!(first
        .bytes()
        .all(|b| hilltop::friends::TRACKING_CODE_ALPHABET.contains(&b)));
}

#[test]
fn code_assignment_gives_up_after_bounded_retries() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "AAAAAA").unwrap();

    // A generator that only ever produces the taken code must exhaust.
    let err = friends::assign_code_with(&storage, "alice", || "AAAAAA".to_string()).unwrap_err();
    assert!(matches!(err, FriendError::CodeExhausted));

    // The profile is left without a code and a later attempt can succeed.
    let code = friends::assign_code_with(&storage, "alice", || "BBBBBB".to_string()).unwrap();
    assert_eq!(code, "BBBBBB");
}

#[test]
fn removal_is_one_sided() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "X7K9QP").unwrap();
    friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap();

    friends::remove_friend(&storage, "alice", "bob").unwrap();

    // Alice no longer lists Bob, but Bob still lists Alice.
    assert!(friends::get_friends(&storage, "alice").unwrap().is_empty());
    assert_eq!(friends::get_friends(&storage, "bob").unwrap().len(), 1);

    // Visibility is separate: Bob can still see Alice until she revokes.
    let alice_loc = storage.get_location("alice").unwrap().unwrap();
    assert!(alice_loc.shared_with.contains(&"bob".to_string()));

    friends::revoke_visibility(&storage, "alice", "bob").unwrap();
    let alice_loc = storage.get_location("alice").unwrap().unwrap();
    assert!(!alice_loc.shared_with.contains(&"bob".to_string()));
}

#[test]
fn add_heals_a_missing_reverse_edge() {
    let storage = setup_two_users();
    storage.set_tracking_code("bob", "X7K9QP").unwrap();
    friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap();

    // Simulate an earlier partial failure: bob's edge is gone.
    storage.delete_friend("bob", "alice").unwrap();
    friends::remove_friend(&storage, "alice", "bob").unwrap();

    friends::add_friend_by_code(&storage, "alice", "X7K9QP").unwrap();
    assert!(storage.get_friend_edge("bob", "alice").unwrap().is_some());
}
