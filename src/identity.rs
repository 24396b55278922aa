//! Identity-provider boundary.
//!
//! Sign-in itself is handled by a hosted provider; this module only
//! consumes the opaque account payload it hands us and keeps the local
//! profile row in sync.  The provider's user ID becomes `ProfileRow.id`
//! and is never generated or rewritten locally.

use serde::{Deserialize, Serialize};

use crate::storage::{now_secs, ProfileRow, Storage, StorageError};

/// Fallback display name when the provider supplies no usable name parts.
pub const DEFAULT_DISPLAY_NAME: &str = "Student";

/// Account payload from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

/// Session lifecycle events emitted by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { account: AccountInfo },
    SignedOut,
    TokenRefreshed,
}

/// "first last" with empty parts dropped, else the default label.
pub fn display_name_for(account: &AccountInfo) -> String {
    let joined = format!(
        "{} {}",
        account.first_name.as_deref().unwrap_or(""),
        account.last_name.as_deref().unwrap_or("")
    );
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Upsert the profile row for a signed-in account.  Runs on every sign-in;
/// the upsert refreshes identity fields while leaving any existing tracking
/// code in place.
pub fn sync_account(storage: &Storage, account: &AccountInfo) -> Result<ProfileRow, StorageError> {
    let row = ProfileRow {
        id: account.id.clone(),
        email: account.email.clone(),
        display_name: Some(display_name_for(account)),
        photo_url: account.image_url.clone(),
        provider: "clerk".to_string(),
        tracking_code: None,
        updated_at: now_secs(),
    };
    storage.upsert_profile(&row)?;
    crate::hlog!(
        "session: synced profile for {}",
        crate::logging::user_id(&account.id)
    );
    // Re-read so the caller sees the preserved tracking code, if any.
    storage
        .get_profile(&account.id)?
        .ok_or_else(|| StorageError::NotFound(format!("profile {}", account.id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(first: Option<&str>, last: Option<&str>) -> AccountInfo {
        AccountInfo {
            id: "user_2abc".to_string(),
            email: Some("maria@example.edu".to_string()),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            image_url: None,
        }
    }

    #[test]
    fn display_name_joins_and_falls_back() {
        assert_eq!(
            display_name_for(&account(Some("Maria"), Some("Santos"))),
            "Maria Santos"
        );
        assert_eq!(display_name_for(&account(Some("Maria"), None)), "Maria");
        assert_eq!(display_name_for(&account(None, None)), DEFAULT_DISPLAY_NAME);
        assert_eq!(
            display_name_for(&account(Some("  "), Some(""))),
            DEFAULT_DISPLAY_NAME
        );
    }

    #[test]
    fn sync_upserts_and_preserves_code() {
        let storage = Storage::open_in_memory().unwrap();
        let acct = account(Some("Maria"), Some("Santos"));

        let first = sync_account(&storage, &acct).unwrap();
        assert_eq!(first.display_name.as_deref(), Some("Maria Santos"));
        assert!(first.tracking_code.is_none());

        storage.set_tracking_code(&acct.id, "X7K9QP").unwrap();

        // Next sign-in refreshes fields but keeps the code.
        let second = sync_account(&storage, &acct).unwrap();
        assert_eq!(second.tracking_code.as_deref(), Some("X7K9QP"));
    }
}
