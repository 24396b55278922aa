//! Client-side polling synchronization of friend locations.
//!
//! The hosted store has no push channel for location rows, so clients keep
//! a live-ish view by re-fetching "locations visible to me" on an interval.
//! The view is eventually consistent with a staleness bound of the poll
//! interval plus network latency.
//!
//! The fetch side is behind the [`LocationSource`] trait so a push-based
//! transport could replace polling without touching any caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::storage::{FriendEntry, LocationRow, Storage, StorageError};

/// Default polling interval for background consumers.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10_000);
/// Faster interval used while a live map is on screen.
pub const MAP_POLL_INTERVAL: Duration = Duration::from_millis(5_000);

/// A pollable repository of location rows visible to a viewer.
pub trait LocationSource: Send + 'static {
    fn fetch_visible_to(&self, viewer_id: &str) -> Result<Vec<LocationRow>, StorageError>;
}

impl LocationSource for Storage {
    fn fetch_visible_to(&self, viewer_id: &str) -> Result<Vec<LocationRow>, StorageError> {
        crate::sharing::fetch_visible_to(self, viewer_id)
    }
}

/// Handle for an active polling subscription.  Unsubscribing is idempotent
/// and suppresses any in-flight fetch's callback: the poll task re-checks
/// the active flag after every fetch and after every sleep, so once
/// [`Subscription::unsubscribe`] has returned no further update callback
/// is delivered.
pub struct Subscription {
    active: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Subscription {
    pub fn unsubscribe(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Start polling `source` for rows visible to `viewer_id`.
///
/// Performs one immediate fetch, invokes `on_update` with the rows, then
/// repeats every `interval` until unsubscribed.  Fetch errors are logged
/// and skipped; the next tick retries.
pub fn subscribe<S, F>(
    source: S,
    viewer_id: String,
    interval: Duration,
    mut on_update: F,
) -> Subscription
where
    S: LocationSource,
    F: FnMut(Vec<LocationRow>) + Send + 'static,
{
    let active = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&active);

    let handle = tokio::spawn(async move {
        loop {
            if !flag.load(Ordering::SeqCst) {
                break;
            }
            let fetched = source.fetch_visible_to(&viewer_id);
            // Consulted again after the fetch: an unsubscribe that landed
            // while the fetch was in flight must win over its callback.
            if !flag.load(Ordering::SeqCst) {
                break;
            }
            match fetched {
                Ok(rows) => on_update(rows),
                Err(e) => {
                    crate::hlog!(
                        "poll: fetch for {} failed: {}",
                        crate::logging::user_id(&viewer_id),
                        e
                    );
                }
            }

            tokio::time::sleep(interval).await;
            if !flag.load(Ordering::SeqCst) {
                break;
            }
        }
    });

    Subscription {
        active,
        handle: Some(handle),
    }
}

// ---------------------------------------------------------------------------
// Staleness text
// ---------------------------------------------------------------------------

/// Human-readable "last seen" text for a location updated at `updated_at`
/// (seconds since epoch).  Under a minute is "Just now"; under an hour is
/// minutes; everything else is whole hours, with no days tier.
pub fn last_seen_text(updated_at: u64, now: u64) -> String {
    let diff_mins = now.saturating_sub(updated_at) / 60;
    if diff_mins >= 60 {
        format!("{}h ago", diff_mins / 60)
    } else if diff_mins > 0 {
        format!("{diff_mins} min ago")
    } else {
        "Just now".to_string()
    }
}

// ---------------------------------------------------------------------------
// Roster reconciliation
// ---------------------------------------------------------------------------

/// A friend with a usable location fix: rendered as a map marker.
#[derive(Debug, Clone, Serialize)]
pub struct FriendMarker {
    pub user_id: String,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub last_seen: String,
    pub photo_url: Option<String>,
}

/// A friend with no usable fix yet: listed but un-selectable, no marker.
#[derive(Debug, Clone, Serialize)]
pub struct WaitingFriend {
    pub user_id: String,
    pub title: String,
}

/// The renderable view of a friend roster joined with fetched locations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RosterView {
    pub located: Vec<FriendMarker>,
    pub waiting: Vec<WaitingFriend>,
}

/// Join fetched location rows to the friend roster by user ID.
///
/// Friends with a located row become markers with "last seen" text; friends
/// without one (or with null coordinates) are listed as waiting.  Location
/// rows with no matching friend (the friend removed the edge but
/// visibility was never revoked) are dropped silently and never surface
/// as anonymous markers.
pub fn reconcile(friends: &[FriendEntry], locations: &[LocationRow], now: u64) -> RosterView {
    let mut view = RosterView::default();

    for friend in friends {
        let located = locations.iter().find(|loc| loc.user_id == friend.id);
        match located {
            Some(loc) if loc.latitude.is_some() && loc.longitude.is_some() => {
                view.located.push(FriendMarker {
                    user_id: friend.id.clone(),
                    title: title_for(friend),
                    latitude: loc.latitude.unwrap_or_default(),
                    longitude: loc.longitude.unwrap_or_default(),
                    last_seen: last_seen_text(loc.updated_at, now),
                    photo_url: friend.photo_url.clone(),
                });
            }
            _ => view.waiting.push(WaitingFriend {
                user_id: friend.id.clone(),
                title: title_for(friend),
            }),
        }
    }

    view
}

fn title_for(friend: &FriendEntry) -> String {
    if let Some(name) = friend.display_name.as_deref() {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    friend
        .email
        .as_deref()
        .and_then(|e| e.split('@').next())
        .filter(|local| !local.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "Friend".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_seen_tiers() {
        let now = 1_000_000;
        assert_eq!(last_seen_text(now - 30, now), "Just now");
        assert_eq!(last_seen_text(now - 5 * 60, now), "5 min ago");
        assert_eq!(last_seen_text(now - 59 * 60, now), "59 min ago");
        assert_eq!(last_seen_text(now - 125 * 60, now), "2h ago");
        // No days tier: very stale fixes still render as hours.
        assert_eq!(last_seen_text(now - 30 * 3600, now), "30h ago");
        // A timestamp from the future is treated as fresh.
        assert_eq!(last_seen_text(now + 60, now), "Just now");
    }

    fn friend(id: &str, name: Option<&str>) -> FriendEntry {
        FriendEntry {
            friendship_id: 1,
            added_at: 0,
            id: id.to_string(),
            email: Some(format!("{id}@example.edu")),
            display_name: name.map(str::to_string),
            photo_url: None,
        }
    }

    fn located(user_id: &str, updated_at: u64) -> LocationRow {
        LocationRow {
            user_id: user_id.to_string(),
            latitude: Some(14.72),
            longitude: Some(121.04),
            shared_with: vec![],
            updated_at,
        }
    }

    #[test]
    fn friends_split_into_located_and_waiting() {
        let friends = vec![friend("a", Some("Ana")), friend("b", None)];
        let locations = vec![located("a", 990)];
        let view = reconcile(&friends, &locations, 1000);

        assert_eq!(view.located.len(), 1);
        assert_eq!(view.located[0].title, "Ana");
        assert_eq!(view.located[0].last_seen, "Just now");
        assert_eq!(view.waiting.len(), 1);
        assert_eq!(view.waiting[0].title, "b");
    }

    #[test]
    fn null_coordinates_count_as_waiting() {
        let friends = vec![friend("a", Some("Ana"))];
        let locations = vec![LocationRow {
            user_id: "a".to_string(),
            latitude: None,
            longitude: None,
            shared_with: vec![],
            updated_at: 0,
        }];
        let view = reconcile(&friends, &locations, 1000);
        assert!(view.located.is_empty());
        assert_eq!(view.waiting.len(), 1);
    }

    #[test]
    fn orphan_location_rows_are_dropped() {
        // A row from someone no longer in the roster must never surface as
        // an anonymous marker.
        let friends = vec![friend("a", Some("Ana"))];
        let locations = vec![located("a", 1000), located("stranger", 1000)];
        let view = reconcile(&friends, &locations, 1000);
        assert_eq!(view.located.len(), 1);
        assert_eq!(view.located[0].user_id, "a");
        assert!(view.waiting.is_empty());
    }
}
