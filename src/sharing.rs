//! Location sharing coordinator.
//!
//! Two independent writers touch the same location row: the live GPS-fix
//! updater owns the coordinate fields, and the sharing grant/revoke
//! operations own the `shared_with` allow-list.  Each writer goes through
//! a single-statement storage update that only touches its own fields, so
//! a location fix can never empty the allow-list and a grant can never
//! clobber a captured fix with null, regardless of interleaving.

use crate::storage::{now_secs, LocationRow, Storage, StorageError};

/// Record a location fix for `user_id`.  The allow-list is untouched.
pub fn update_own_location(
    storage: &Storage,
    user_id: &str,
    latitude: f64,
    longitude: f64,
) -> Result<(), StorageError> {
    storage.upsert_coordinates(user_id, latitude, longitude, now_secs())
}

/// Grant `viewer_id` visibility of `owner_id`'s location.
///
/// Creates the location row if the owner has never captured a fix (null
/// coordinates mean "not yet locatable").  A no-op when the viewer is
/// already in the allow-list; existing coordinates are always preserved.
pub fn share_location_with(
    storage: &Storage,
    owner_id: &str,
    viewer_id: &str,
) -> Result<(), StorageError> {
    storage.add_shared_viewer(owner_id, viewer_id, now_secs())
}

/// Remove `viewer_id` from `owner_id`'s allow-list.  Coordinates are left
/// untouched; a missing row or absent viewer is a no-op.
pub fn stop_sharing_with(
    storage: &Storage,
    owner_id: &str,
    viewer_id: &str,
) -> Result<(), StorageError> {
    storage.remove_shared_viewer(owner_id, viewer_id, now_secs())
}

/// All location rows visible to `viewer_id`.  Allow-list membership is the
/// sole read-authorization gate, independent of the friendship registry.
pub fn fetch_visible_to(
    storage: &Storage,
    viewer_id: &str,
) -> Result<Vec<LocationRow>, StorageError> {
    storage.list_locations_shared_with(viewer_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_preserves_allow_list() {
        let storage = Storage::open_in_memory().unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();
        update_own_location(&storage, "owner", 14.72, 121.04).unwrap();

        let row = storage.get_location("owner").unwrap().unwrap();
        assert_eq!(row.shared_with, vec!["viewer".to_string()]);
        assert_eq!(row.latitude, Some(14.72));
    }

    #[test]
    fn grant_preserves_coordinates() {
        let storage = Storage::open_in_memory().unwrap();
        update_own_location(&storage, "owner", 14.72, 121.04).unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();

        let row = storage.get_location("owner").unwrap().unwrap();
        assert_eq!(row.latitude, Some(14.72));
        assert_eq!(row.longitude, Some(121.04));
        assert_eq!(row.shared_with, vec!["viewer".to_string()]);
    }

    #[test]
    fn grant_before_any_fix_leaves_null_coordinates() {
        let storage = Storage::open_in_memory().unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();

        let row = storage.get_location("owner").unwrap().unwrap();
        assert_eq!(row.latitude, None);
        assert_eq!(row.longitude, None);
    }

    #[test]
    fn duplicate_grant_is_noop() {
        let storage = Storage::open_in_memory().unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();

        let row = storage.get_location("owner").unwrap().unwrap();
        assert_eq!(row.shared_with.len(), 1);
    }

    #[test]
    fn revoke_removes_single_viewer() {
        let storage = Storage::open_in_memory().unwrap();
        update_own_location(&storage, "owner", 14.72, 121.04).unwrap();
        share_location_with(&storage, "owner", "a").unwrap();
        share_location_with(&storage, "owner", "b").unwrap();

        stop_sharing_with(&storage, "owner", "a").unwrap();

        let row = storage.get_location("owner").unwrap().unwrap();
        assert_eq!(row.shared_with, vec!["b".to_string()]);
        // Coordinates untouched by the revoke.
        assert_eq!(row.latitude, Some(14.72));
    }

    #[test]
    fn revoke_without_row_is_noop() {
        let storage = Storage::open_in_memory().unwrap();
        stop_sharing_with(&storage, "owner", "viewer").unwrap();
        assert!(storage.get_location("owner").unwrap().is_none());
    }

    #[test]
    fn visibility_is_independent_of_friend_edges() {
        let storage = Storage::open_in_memory().unwrap();
        update_own_location(&storage, "owner", 14.72, 121.04).unwrap();
        share_location_with(&storage, "owner", "viewer").unwrap();

        // No friend edge exists, yet the row is visible: the allow-list is
        // the sole gate.
        let visible = fetch_visible_to(&storage, "viewer").unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].user_id, "owner");

        assert!(fetch_visible_to(&storage, "stranger").unwrap().is_empty());
    }
}
