//! On-disk storage round trip: state written by one handle is visible
//! after reopening the database.

use hilltop::storage::{now_secs, ProfileRow, Storage};

#[test]
fn database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("hilltop.db");

    {
        let storage = Storage::open(&db_path).unwrap();
        storage
            .upsert_profile(&ProfileRow {
                id: "alice".to_string(),
                email: Some("alice@school.edu".to_string()),
                display_name: Some("Alice Cruz".to_string()),
                photo_url: None,
                provider: "clerk".to_string(),
                tracking_code: None,
                updated_at: now_secs(),
            })
            .unwrap();
        storage.set_tracking_code("alice", "X7K9QP").unwrap();
        hilltop::sharing::update_own_location(&storage, "alice", 14.7198, 121.0449).unwrap();
    }

    let storage = Storage::open(&db_path).unwrap();
    let profile = storage.get_profile("alice").unwrap().unwrap();
    assert_eq!(profile.tracking_code.as_deref(), Some("X7K9QP"));

    let loc = storage.get_location("alice").unwrap().unwrap();
    assert_eq!(loc.latitude, Some(14.7198));
    assert!(loc.shared_with.is_empty());
}
