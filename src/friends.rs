//! Friendship registry: tracking codes and mutual tracking relationships.
//!
//! A user shares their short tracking code out-of-band; another user enters
//! it to start tracking them.  Adding a friend by code creates a directed
//! edge in each direction and grants location visibility both ways, so
//! tracking is always mutual by construction.

use rand::Rng;

use crate::sharing;
use crate::storage::{FriendEntry, ProfileRow, Storage, StorageError};

/// Tracking code alphabet: 32 symbols, visually ambiguous characters
/// (0/O/1/I) excluded.
pub const TRACKING_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const TRACKING_CODE_LEN: usize = 6;

/// How many fresh codes to try before giving up on uniqueness.
pub const MAX_CODE_ATTEMPTS: usize = 10;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FriendError {
    /// No profile matches the given tracking code.
    CodeNotFound,
    /// A user cannot track themselves.
    SelfAdd,
    /// The directed edge already exists.
    AlreadyTracking,
    /// Could not find an unused tracking code within the attempt cap.
    CodeExhausted,
    Storage(StorageError),
}

impl std::fmt::Display for FriendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FriendError::CodeNotFound => write!(f, "no user found with this code"),
            FriendError::SelfAdd => write!(f, "you cannot add yourself"),
            FriendError::AlreadyTracking => {
                write!(f, "you are already tracking this person")
            }
            FriendError::CodeExhausted => {
                write!(f, "failed to generate a unique tracking code")
            }
            FriendError::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for FriendError {}

impl From<StorageError> for FriendError {
    fn from(e: StorageError) -> Self {
        FriendError::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Tracking codes
// ---------------------------------------------------------------------------

/// Generate a random 6-character tracking code.
pub fn generate_tracking_code<R: Rng>(rng: &mut R) -> String {
    (0..TRACKING_CODE_LEN)
        .map(|_| {
            let i = rng.gen_range(0..TRACKING_CODE_ALPHABET.len());
            TRACKING_CODE_ALPHABET[i] as char
        })
        .collect()
}

/// Uppercase/trim a user-entered code before lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Return the user's tracking code, generating and persisting one on first
/// request.  Codes are immutable once set.
pub fn get_or_create_tracking_code(
    storage: &Storage,
    user_id: &str,
) -> Result<String, FriendError> {
    let mut rng = rand::thread_rng();
    assign_code_with(storage, user_id, || generate_tracking_code(&mut rng))
}

/// Inner assignment loop with an injectable generator, so tests can force
/// collisions.  Tries up to [`MAX_CODE_ATTEMPTS`] candidates and fails with
/// `CodeExhausted` rather than looping forever.
pub fn assign_code_with(
    storage: &Storage,
    user_id: &str,
    mut generate: impl FnMut() -> String,
) -> Result<String, FriendError> {
    let profile = storage
        .get_profile(user_id)?
        .ok_or(FriendError::Storage(StorageError::NotFound(format!(
            "profile {user_id}"
        ))))?;
    if let Some(code) = profile.tracking_code {
        return Ok(code);
    }

    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = generate();
        if storage.find_profile_by_tracking_code(&code)?.is_some() {
            continue;
        }
        match storage.set_tracking_code(user_id, &code) {
            Ok(()) => return Ok(code),
            // Lost a race for this code; try another candidate.
            Err(StorageError::AlreadyExists(_)) => {
                if let Some(p) = storage.get_profile(user_id)? {
                    if let Some(existing) = p.tracking_code {
                        return Ok(existing);
                    }
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(FriendError::CodeExhausted)
}

/// Resolve a tracking code to its profile.  Lookup is case-insensitive via
/// normalization; the stored code is always uppercase.
pub fn find_by_tracking_code(storage: &Storage, code: &str) -> Result<ProfileRow, FriendError> {
    let normalized = normalize_code(code);
    storage
        .find_profile_by_tracking_code(&normalized)?
        .ok_or(FriendError::CodeNotFound)
}

// ---------------------------------------------------------------------------
// Friendship edges
// ---------------------------------------------------------------------------

/// Result of a successful friend-add.
#[derive(Debug, Clone)]
pub struct FriendAdded {
    pub friend: ProfileRow,
    pub message: String,
}

/// Friendly display name for confirmations: display name, else the email
/// local part, else a generic label.
pub fn display_label(profile: &ProfileRow) -> String {
    if let Some(name) = profile.display_name.as_deref() {
        if !name.trim().is_empty() {
            return name.to_string();
        }
    }
    if let Some(email) = profile.email.as_deref() {
        if let Some(local) = email.split('@').next() {
            if !local.is_empty() {
                return local.to_string();
            }
        }
    }
    "Friend".to_string()
}

/// Add a friend by tracking code.
///
/// Creates the edge `(requester, target)`, ensures the reverse edge exists
/// (healing a one-directional edge left by an earlier partial failure), and
/// grants location visibility in both directions.  The duplicate check is
/// on the requester's own edge only: a second call for the same target is
/// an explicit [`FriendError::AlreadyTracking`], not a silent no-op.
pub fn add_friend_by_code(
    storage: &Storage,
    requester_id: &str,
    code: &str,
) -> Result<FriendAdded, FriendError> {
    let target = find_by_tracking_code(storage, code)?;

    if target.id == requester_id {
        return Err(FriendError::SelfAdd);
    }

    if storage.get_friend_edge(requester_id, &target.id)?.is_some() {
        return Err(FriendError::AlreadyTracking);
    }

    let now = crate::storage::now_secs();
    storage.insert_friend(requester_id, &target.id, now)?;

    // Complete mutuality idempotently: the reverse edge may already exist
    // from an earlier partial failure or from the target adding first.
    if storage.get_friend_edge(&target.id, requester_id)?.is_none() {
        storage.insert_friend(&target.id, requester_id, now)?;
    }

    // Bi-directional visibility: target shares with requester, requester
    // shares with target.
    sharing::share_location_with(storage, &target.id, requester_id)?;
    sharing::share_location_with(storage, requester_id, &target.id)?;

    let label = display_label(&target);
    crate::hlog!(
        "friend-add: {} now tracking {}",
        crate::logging::user_id(requester_id),
        crate::logging::user_id(&target.id)
    );

    Ok(FriendAdded {
        message: format!("Now tracking {label}. They can also see your location."),
        friend: target,
    })
}

/// Active friends for a user with the counterpart profile attached.
/// Order is unspecified.
pub fn get_friends(storage: &Storage, user_id: &str) -> Result<Vec<FriendEntry>, FriendError> {
    Ok(storage.list_friends(user_id)?)
}

/// Remove one directed edge only.  The reverse edge and any granted
/// visibility are left in place; callers that want a full break also call
/// [`revoke_visibility`].
pub fn remove_friend(
    storage: &Storage,
    user_id: &str,
    friend_id: &str,
) -> Result<(), FriendError> {
    storage.delete_friend(user_id, friend_id)?;
    Ok(())
}

/// Stop `viewer_id` from seeing `owner_id`'s location.  Independent of
/// [`remove_friend`] so callers decide whether removal also revokes.
pub fn revoke_visibility(
    storage: &Storage,
    owner_id: &str,
    viewer_id: &str,
) -> Result<(), FriendError> {
    sharing::stop_sharing_with(storage, owner_id, viewer_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_safe_alphabet() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let code = generate_tracking_code(&mut rng);
            assert_eq!(code.len(), TRACKING_CODE_LEN);
            for c in code.bytes() {
                assert!(
                    TRACKING_CODE_ALPHABET.contains(&c),
                    "unexpected character {:?}",
                    c as char
                );
                assert!(!b"0O1I".contains(&c));
            }
        }
    }

    #[test]
    fn normalization_uppercases_and_trims() {
        assert_eq!(normalize_code("  x7k9qp "), "X7K9QP");
        assert_eq!(normalize_code("X7K9QP"), "X7K9QP");
    }

    #[test]
    fn display_label_fallbacks() {
        let mut p = ProfileRow {
            id: "u1".to_string(),
            email: Some("maria.santos@example.edu".to_string()),
            display_name: Some("Maria Santos".to_string()),
            photo_url: None,
            provider: "clerk".to_string(),
            tracking_code: None,
            updated_at: 0,
        };
        assert_eq!(display_label(&p), "Maria Santos");
        p.display_name = None;
        assert_eq!(display_label(&p), "maria.santos");
        p.email = None;
        assert_eq!(display_label(&p), "Friend");
    }
}
