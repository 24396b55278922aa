//! SQLite storage layer for hilltop.
//!
//! Provides a shared database for the server and for embedding callers.
//! Handles schema creation and CRUD operations for all entity types:
//! profiles, friendship edges, location records, emergency contacts,
//! SOS alerts, and route history.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// Current time as seconds since UNIX epoch.
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StorageError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
    NotFound(String),
    AlreadyExists(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Sqlite(e) => write!(f, "sqlite error: {e}"),
            StorageError::Serde(e) => write!(f, "serialization error: {e}"),
            StorageError::NotFound(msg) => write!(f, "not found: {msg}"),
            StorageError::AlreadyExists(msg) => write!(f, "already exists: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Sqlite(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serde(e)
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Profile row stored in the database.  `id` is the identity provider's
/// opaque user ID and is never generated locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub provider: String,
    /// Public 6-character code used to establish tracking relationships.
    /// Generated lazily on first request; immutable once set.
    pub tracking_code: Option<String>,
    pub updated_at: u64,
}

/// Directed friendship edge.  Mutual tracking is modelled as two rows,
/// one per direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendRow {
    pub id: i64,
    pub user_id: String,
    pub friend_id: String,
    /// Only "active" is used.
    pub status: String,
    pub added_at: u64,
}

/// A friend edge joined to the counterpart's profile, as returned by
/// [`Storage::list_friends`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendEntry {
    pub friendship_id: i64,
    pub added_at: u64,
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

/// Location record: one row per user.  Coordinates stay null until the
/// first fix is captured; consumers must treat null lat/lng as "not yet
/// locatable", not as an error.  `shared_with` is the sole authorization
/// gate for reading the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationRow {
    pub user_id: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub shared_with: Vec<String>,
    pub updated_at: u64,
}

/// Emergency contact row, owned by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContactRow {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub phone: String,
    pub relationship: Option<String>,
    pub created_at: u64,
}

/// SOS alert row.  Created once per activation; cancellation is a status
/// transition, never a delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SosAlertRow {
    pub id: i64,
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub message: String,
    /// "active" or "cancelled".
    pub status: String,
    pub created_at: u64,
}

/// Saved route history entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteHistoryRow {
    pub id: i64,
    pub user_id: String,
    pub origin: String,
    pub destination: String,
    pub route_data: Option<serde_json::Value>,
    pub created_at: u64,
}

// ---------------------------------------------------------------------------
// Storage handle
// ---------------------------------------------------------------------------

/// Main storage handle wrapping a SQLite connection.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open or create a database at the given path. Creates schema if needed.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    /// Create an in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let storage = Self { conn };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS profiles (
                id              TEXT PRIMARY KEY,
                email           TEXT,
                display_name    TEXT,
                photo_url       TEXT,
                provider        TEXT NOT NULL DEFAULT 'email',
                tracking_code   TEXT UNIQUE,
                updated_at      INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS friends (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL,
                friend_id   TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active',
                added_at    INTEGER NOT NULL,
                UNIQUE (user_id, friend_id)
            );

            CREATE INDEX IF NOT EXISTS idx_friends_user
                ON friends(user_id, status);

            CREATE TABLE IF NOT EXISTS locations (
                user_id     TEXT PRIMARY KEY,
                latitude    REAL,
                longitude   REAL,
                shared_with TEXT NOT NULL DEFAULT '[]',
                updated_at  INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS emergency_contacts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id         TEXT NOT NULL,
                name            TEXT NOT NULL,
                phone           TEXT NOT NULL,
                relationship    TEXT,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contacts_user
                ON emergency_contacts(user_id, created_at);

            CREATE TABLE IF NOT EXISTS sos_alerts (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL,
                latitude    REAL NOT NULL,
                longitude   REAL NOT NULL,
                message     TEXT NOT NULL,
                status      TEXT NOT NULL DEFAULT 'active',
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sos_user_status
                ON sos_alerts(user_id, status, created_at);

            CREATE TABLE IF NOT EXISTS route_history (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     TEXT NOT NULL,
                origin      TEXT NOT NULL,
                destination TEXT NOT NULL,
                route_data  TEXT,
                created_at  INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_user
                ON route_history(user_id, created_at);
            ",
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Insert or update a profile.  On conflict the identity fields are
    /// refreshed but `tracking_code` is left untouched, so a code set
    /// earlier survives every subsequent sign-in upsert.
    pub fn upsert_profile(&self, row: &ProfileRow) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO profiles (id, email, display_name, photo_url, provider, tracking_code, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                email = excluded.email,
                display_name = excluded.display_name,
                photo_url = excluded.photo_url,
                provider = excluded.provider,
                updated_at = excluded.updated_at",
            params![
                row.id,
                row.email,
                row.display_name,
                row.photo_url,
                row.provider,
                row.tracking_code,
                row.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    pub fn get_profile(&self, user_id: &str) -> Result<Option<ProfileRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, display_name, photo_url, provider, tracking_code, updated_at
             FROM profiles WHERE id = ?1",
        )?;
        let row = stmt
            .query_row(params![user_id], |row| {
                Ok(ProfileRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    photo_url: row.get(3)?,
                    provider: row.get(4)?,
                    tracking_code: row.get(5)?,
                    updated_at: row.get::<_, i64>(6)? as u64,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Update display fields only.  Returns NotFound for an unknown user.
    pub fn update_profile_fields(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE profiles SET
                display_name = COALESCE(?2, display_name),
                photo_url = COALESCE(?3, photo_url),
                updated_at = ?4
             WHERE id = ?1",
            params![user_id, display_name, photo_url, now_secs() as i64],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("profile {user_id}")));
        }
        Ok(())
    }

    /// Set a profile's tracking code.  Fails with `AlreadyExists` if the
    /// profile already has a code (codes are immutable once set) or if the
    /// code is taken by another profile.
    pub fn set_tracking_code(&self, user_id: &str, code: &str) -> Result<(), StorageError> {
        let result = self.conn.execute(
            "UPDATE profiles SET tracking_code = ?2
             WHERE id = ?1 AND tracking_code IS NULL",
            params![user_id, code],
        );
        match result {
            // Zero rows changed: either no such profile, or the code was
            // already set (possibly by a concurrent writer).
            Ok(0) => match self.get_profile(user_id)? {
                Some(_) => Err(StorageError::AlreadyExists(format!(
                    "profile {user_id} already has a tracking code"
                ))),
                None => Err(StorageError::NotFound(format!("profile {user_id}"))),
            },
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let _ = msg;
                Err(StorageError::AlreadyExists(format!(
                    "tracking code {code} is taken"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Exact-match lookup by tracking code.  Callers are responsible for
    /// normalizing the code first.
    pub fn find_profile_by_tracking_code(
        &self,
        code: &str,
    ) -> Result<Option<ProfileRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, display_name, photo_url, provider, tracking_code, updated_at
             FROM profiles WHERE tracking_code = ?1",
        )?;
        let row = stmt
            .query_row(params![code], |row| {
                Ok(ProfileRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    photo_url: row.get(3)?,
                    provider: row.get(4)?,
                    tracking_code: row.get(5)?,
                    updated_at: row.get::<_, i64>(6)? as u64,
                })
            })
            .optional()?;
        Ok(row)
    }

    // -----------------------------------------------------------------------
    // Friendship edges
    // -----------------------------------------------------------------------

    /// Insert a directed edge.  Returns `AlreadyExists` on a duplicate.
    pub fn insert_friend(
        &self,
        user_id: &str,
        friend_id: &str,
        added_at: u64,
    ) -> Result<i64, StorageError> {
        let result = self.conn.execute(
            "INSERT INTO friends (user_id, friend_id, status, added_at)
             VALUES (?1, ?2, 'active', ?3)",
            params![user_id, friend_id, added_at as i64],
        );
        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::AlreadyExists(format!(
                    "friend edge {user_id} -> {friend_id}"
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_friend_edge(
        &self,
        user_id: &str,
        friend_id: &str,
    ) -> Result<Option<FriendRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, friend_id, status, added_at
             FROM friends WHERE user_id = ?1 AND friend_id = ?2",
        )?;
        let row = stmt
            .query_row(params![user_id, friend_id], |row| {
                Ok(FriendRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    friend_id: row.get(2)?,
                    status: row.get(3)?,
                    added_at: row.get::<_, i64>(4)? as u64,
                })
            })
            .optional()?;
        Ok(row)
    }

    /// Delete one directed edge.  Returns whether a row was removed.
    pub fn delete_friend(&self, user_id: &str, friend_id: &str) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM friends WHERE user_id = ?1 AND friend_id = ?2",
            params![user_id, friend_id],
        )?;
        Ok(changed > 0)
    }

    /// Active edges for `user_id`, joined to the counterpart profiles.
    pub fn list_friends(&self, user_id: &str) -> Result<Vec<FriendEntry>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.added_at, p.id, p.email, p.display_name, p.photo_url
             FROM friends f
             JOIN profiles p ON p.id = f.friend_id
             WHERE f.user_id = ?1 AND f.status = 'active'",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(FriendEntry {
                    friendship_id: row.get(0)?,
                    added_at: row.get::<_, i64>(1)? as u64,
                    id: row.get(2)?,
                    email: row.get(3)?,
                    display_name: row.get(4)?,
                    photo_url: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // -----------------------------------------------------------------------
    // Location records
    // -----------------------------------------------------------------------

    pub fn get_location(&self, user_id: &str) -> Result<Option<LocationRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, latitude, longitude, shared_with, updated_at
             FROM locations WHERE user_id = ?1",
        )?;
        let raw = stmt
            .query_row(params![user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<f64>>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .optional()?;
        match raw {
            Some((user_id, latitude, longitude, shared_json, updated_at)) => {
                let shared_with: Vec<String> = serde_json::from_str(&shared_json)?;
                Ok(Some(LocationRow {
                    user_id,
                    latitude,
                    longitude,
                    shared_with,
                    updated_at: updated_at as u64,
                }))
            }
            None => Ok(None),
        }
    }

    /// Record a location fix.  Single-statement upsert that owns only the
    /// coordinate fields: a fresh row starts with an empty allow-list, an
    /// existing row keeps whatever allow-list it has, so a fix can never
    /// race a sharing grant into a lost update.
    pub fn upsert_coordinates(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
        updated_at: u64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO locations (user_id, latitude, longitude, shared_with, updated_at)
             VALUES (?1, ?2, ?3, '[]', ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                updated_at = excluded.updated_at",
            params![user_id, latitude, longitude, updated_at as i64],
        )?;
        Ok(())
    }

    /// Append `viewer_id` to the allow-list.  Single-statement upsert that
    /// owns only the allow-list: coordinates are never touched, a fresh row
    /// is created with null coordinates, and an already-present viewer
    /// leaves the row entirely unchanged.
    pub fn add_shared_viewer(
        &self,
        user_id: &str,
        viewer_id: &str,
        updated_at: u64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO locations (user_id, latitude, longitude, shared_with, updated_at)
             VALUES (?1, NULL, NULL, json_array(?2), ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                shared_with = json_insert(locations.shared_with, '$[#]', ?2),
                updated_at = ?3
             WHERE NOT EXISTS (
                SELECT 1 FROM json_each(locations.shared_with) WHERE value = ?2
             )",
            params![user_id, viewer_id, updated_at as i64],
        )?;
        Ok(())
    }

    /// Remove `viewer_id` from the allow-list, leaving coordinates
    /// untouched.  A missing row or absent viewer changes nothing.
    pub fn remove_shared_viewer(
        &self,
        user_id: &str,
        viewer_id: &str,
        updated_at: u64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE locations SET
                shared_with = (SELECT COALESCE(json_group_array(value), '[]')
                               FROM json_each(shared_with) WHERE value <> ?2),
                updated_at = ?3
             WHERE user_id = ?1
               AND EXISTS (SELECT 1 FROM json_each(shared_with) WHERE value = ?2)",
            params![user_id, viewer_id, updated_at as i64],
        )?;
        Ok(())
    }

    /// All location rows whose allow-list contains `viewer_id`.  This is the
    /// single authorization check for location reads.  The working set is a
    /// user's friend circle, so rows are filtered after decoding rather than
    /// pushing JSON containment into SQL.
    pub fn list_locations_shared_with(
        &self,
        viewer_id: &str,
    ) -> Result<Vec<LocationRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, latitude, longitude, shared_with, updated_at FROM locations",
        )?;
        let raw: Vec<(String, Option<f64>, Option<f64>, String, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut visible = Vec::new();
        for (user_id, latitude, longitude, shared_json, updated_at) in raw {
            let shared_with: Vec<String> = serde_json::from_str(&shared_json)?;
            if shared_with.iter().any(|id| id == viewer_id) {
                visible.push(LocationRow {
                    user_id,
                    latitude,
                    longitude,
                    shared_with,
                    updated_at: updated_at as u64,
                });
            }
        }
        Ok(visible)
    }

    // -----------------------------------------------------------------------
    // Emergency contacts
    // -----------------------------------------------------------------------

    pub fn insert_contact(
        &self,
        user_id: &str,
        name: &str,
        phone: &str,
        relationship: Option<&str>,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO emergency_contacts (user_id, name, phone, relationship, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, name, phone, relationship, now_secs() as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Contacts for a user, newest first.
    pub fn list_contacts(&self, user_id: &str) -> Result<Vec<EmergencyContactRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, name, phone, relationship, created_at
             FROM emergency_contacts WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(EmergencyContactRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    name: row.get(2)?,
                    phone: row.get(3)?,
                    relationship: row.get(4)?,
                    created_at: row.get::<_, i64>(5)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_contact(
        &self,
        contact_id: i64,
        name: Option<&str>,
        phone: Option<&str>,
        relationship: Option<&str>,
    ) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE emergency_contacts SET
                name = COALESCE(?2, name),
                phone = COALESCE(?3, phone),
                relationship = COALESCE(?4, relationship)
             WHERE id = ?1",
            params![contact_id, name, phone, relationship],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("contact {contact_id}")));
        }
        Ok(())
    }

    pub fn delete_contact(&self, contact_id: i64) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM emergency_contacts WHERE id = ?1",
            params![contact_id],
        )?;
        Ok(changed > 0)
    }

    // -----------------------------------------------------------------------
    // SOS alerts
    // -----------------------------------------------------------------------

    pub fn insert_sos_alert(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
        message: &str,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO sos_alerts (user_id, latitude, longitude, message, status, created_at)
             VALUES (?1, ?2, ?3, ?4, 'active', ?5)",
            params![user_id, latitude, longitude, message, now_secs() as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Set an alert's status.  Returns NotFound for an unknown alert.
    pub fn update_sos_status(&self, alert_id: i64, status: &str) -> Result<(), StorageError> {
        let changed = self.conn.execute(
            "UPDATE sos_alerts SET status = ?2 WHERE id = ?1",
            params![alert_id, status],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("sos alert {alert_id}")));
        }
        Ok(())
    }

    /// Active alerts for a user, newest first.
    pub fn list_active_sos_alerts(
        &self,
        user_id: &str,
    ) -> Result<Vec<SosAlertRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, latitude, longitude, message, status, created_at
             FROM sos_alerts WHERE user_id = ?1 AND status = 'active'
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(SosAlertRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    message: row.get(4)?,
                    status: row.get(5)?,
                    created_at: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_sos_alert(&self, alert_id: i64) -> Result<Option<SosAlertRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, latitude, longitude, message, status, created_at
             FROM sos_alerts WHERE id = ?1",
        )?;
        let row = stmt
            .query_row(params![alert_id], |row| {
                Ok(SosAlertRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    message: row.get(4)?,
                    status: row.get(5)?,
                    created_at: row.get::<_, i64>(6)? as u64,
                })
            })
            .optional()?;
        Ok(row)
    }

    // -----------------------------------------------------------------------
    // Route history
    // -----------------------------------------------------------------------

    pub fn insert_route_history(
        &self,
        user_id: &str,
        origin: &str,
        destination: &str,
        route_data: Option<&serde_json::Value>,
    ) -> Result<i64, StorageError> {
        let data_json = match route_data {
            Some(v) => Some(serde_json::to_string(v)?),
            None => None,
        };
        self.conn.execute(
            "INSERT INTO route_history (user_id, origin, destination, route_data, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user_id, origin, destination, data_json, now_secs() as i64],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent routes for a user, newest first, capped at `limit`.
    pub fn list_route_history(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<RouteHistoryRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, origin, destination, route_data, created_at
             FROM route_history WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT ?2",
        )?;
        let raw: Vec<(i64, String, String, String, Option<String>, i64)> = stmt
            .query_map(params![user_id, limit], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw.len());
        for (id, user_id, origin, destination, data_json, created_at) in raw {
            let route_data = match data_json {
                Some(s) => Some(serde_json::from_str(&s)?),
                None => None,
            };
            rows.push(RouteHistoryRow {
                id,
                user_id,
                origin,
                destination,
                route_data,
                created_at: created_at as u64,
            });
        }
        Ok(rows)
    }

    pub fn delete_route_history(&self, route_id: i64) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM route_history WHERE id = ?1",
            params![route_id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> ProfileRow {
        ProfileRow {
            id: id.to_string(),
            email: Some(format!("{id}@example.edu")),
            display_name: Some(id.to_string()),
            photo_url: None,
            provider: "clerk".to_string(),
            tracking_code: None,
            updated_at: now_secs(),
        }
    }

    #[test]
    fn upsert_preserves_tracking_code() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_profile(&profile("alice")).unwrap();
        storage.set_tracking_code("alice", "X7K9QP").unwrap();

        // Second sign-in upsert must not clear the code.
        let mut again = profile("alice");
        again.display_name = Some("Alice M.".to_string());
        storage.upsert_profile(&again).unwrap();

        let stored = storage.get_profile("alice").unwrap().unwrap();
        assert_eq!(stored.tracking_code.as_deref(), Some("X7K9QP"));
        assert_eq!(stored.display_name.as_deref(), Some("Alice M."));
    }

    #[test]
    fn tracking_code_is_immutable() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_profile(&profile("alice")).unwrap();
        storage.set_tracking_code("alice", "X7K9QP").unwrap();
        let err = storage.set_tracking_code("alice", "QQQQQQ").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn tracking_code_unique_across_profiles() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_profile(&profile("alice")).unwrap();
        storage.upsert_profile(&profile("bob")).unwrap();
        storage.set_tracking_code("alice", "X7K9QP").unwrap();
        let err = storage.set_tracking_code("bob", "X7K9QP").unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn duplicate_friend_edge_rejected() {
        let storage = Storage::open_in_memory().unwrap();
        storage.insert_friend("a", "b", 1).unwrap();
        let err = storage.insert_friend("a", "b", 2).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
        // Reverse direction is a distinct row.
        storage.insert_friend("b", "a", 3).unwrap();
    }

    #[test]
    fn visible_locations_filtered_by_allow_list() {
        let storage = Storage::open_in_memory().unwrap();
        storage.upsert_coordinates("a", 14.7, 121.0, 1).unwrap();
        storage.add_shared_viewer("a", "viewer", 1).unwrap();
        storage.upsert_coordinates("b", 14.8, 121.1, 1).unwrap();
        storage.add_shared_viewer("b", "someone-else", 1).unwrap();

        let visible = storage.list_locations_shared_with("viewer").unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].user_id, "a");
    }

    #[test]
    fn coordinate_and_allow_list_writers_own_disjoint_fields() {
        let storage = Storage::open_in_memory().unwrap();

        // Grant before any fix: row exists with null coordinates.
        storage.add_shared_viewer("a", "viewer", 1).unwrap();
        let row = storage.get_location("a").unwrap().unwrap();
        assert_eq!(row.latitude, None);
        assert_eq!(row.shared_with, vec!["viewer".to_string()]);

        // A fix never empties the allow-list.
        storage.upsert_coordinates("a", 14.7, 121.0, 2).unwrap();
        let row = storage.get_location("a").unwrap().unwrap();
        assert_eq!(row.latitude, Some(14.7));
        assert_eq!(row.shared_with, vec!["viewer".to_string()]);

        // A second grant never clobbers the fix; duplicates are no-ops.
        storage.add_shared_viewer("a", "other", 3).unwrap();
        storage.add_shared_viewer("a", "viewer", 4).unwrap();
        let row = storage.get_location("a").unwrap().unwrap();
        assert_eq!(row.latitude, Some(14.7));
        assert_eq!(row.shared_with.len(), 2);

        // Removal keeps coordinates and the rest of the list.
        storage.remove_shared_viewer("a", "viewer", 5).unwrap();
        let row = storage.get_location("a").unwrap().unwrap();
        assert_eq!(row.latitude, Some(14.7));
        assert_eq!(row.shared_with, vec!["other".to_string()]);

        // Removing the last viewer leaves a well-formed empty list.
        storage.remove_shared_viewer("a", "other", 6).unwrap();
        let row = storage.get_location("a").unwrap().unwrap();
        assert!(row.shared_with.is_empty());
    }
}
