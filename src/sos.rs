//! Emergency SOS dispatch.
//!
//! Activation is guarded by a long-press: the button must be held for the
//! full threshold before an alert fires, and an early release returns to
//! idle without side effects.  The state machine here is pure (driven by
//! caller-supplied millisecond timestamps) so a UI layer can animate the
//! hold however it likes.
//!
//! Each completed long-press produces exactly one alert row.  Repeated
//! activations are independent rows; nothing merges or rate-limits them.

use serde::Serialize;

use crate::geo::Point;
use crate::storage::{EmergencyContactRow, SosAlertRow, Storage, StorageError};

/// Hold duration required to activate, in milliseconds.
pub const SOS_HOLD_MS: u64 = 3_000;

/// How long the activated state is displayed before auto-resetting to idle.
pub const SOS_DISPLAY_MS: u64 = 5_000;

/// Fallback coordinate used when no fix can be resolved at activation time.
pub const SOS_FALLBACK_POINT: Point = Point {
    latitude: 14.7033,
    longitude: 121.0633,
};

pub const DEFAULT_SOS_MESSAGE: &str = "Emergency SOS Alert!";

// ---------------------------------------------------------------------------
// Long-press state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosButtonState {
    Idle,
    Pressing { started_at_ms: u64 },
    Activated { at_ms: u64 },
}

/// Pure long-press tracker.  Callers feed it press/release/tick events with
/// wall-clock milliseconds and act when [`SosButton::tick`] reports an
/// activation.
#[derive(Debug, Clone, Copy)]
pub struct SosButton {
    state: SosButtonState,
}

impl Default for SosButton {
    fn default() -> Self {
        Self::new()
    }
}

impl SosButton {
    pub fn new() -> Self {
        Self {
            state: SosButtonState::Idle,
        }
    }

    pub fn state(&self) -> SosButtonState {
        self.state
    }

    /// Begin a press.  Ignored unless idle (a press during the activated
    /// display window does nothing).
    pub fn press_started(&mut self, now_ms: u64) {
        if self.state == SosButtonState::Idle {
            self.state = SosButtonState::Pressing {
                started_at_ms: now_ms,
            };
        }
    }

    /// Release the button.  An early release from `Pressing` cancels back
    /// to idle; releasing after activation changes nothing.
    pub fn press_released(&mut self, _now_ms: u64) {
        if matches!(self.state, SosButtonState::Pressing { .. }) {
            self.state = SosButtonState::Idle;
        }
    }

    /// Advance the clock.  Returns `true` exactly once, on the tick where
    /// the hold first reaches the threshold; the caller dispatches the
    /// alert at that point.  Also auto-resets to idle once the activated
    /// display window has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        match self.state {
            SosButtonState::Pressing { started_at_ms }
                if now_ms.saturating_sub(started_at_ms) >= SOS_HOLD_MS =>
            {
                self.state = SosButtonState::Activated { at_ms: now_ms };
                true
            }
            SosButtonState::Activated { at_ms }
                if now_ms.saturating_sub(at_ms) >= SOS_DISPLAY_MS =>
            {
                self.state = SosButtonState::Idle;
                false
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Location resolution and dispatch
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FixError {
    PermissionDenied,
    Unavailable(String),
}

impl std::fmt::Display for FixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FixError::PermissionDenied => write!(f, "location permission denied"),
            FixError::Unavailable(msg) => write!(f, "location unavailable: {msg}"),
        }
    }
}

impl std::error::Error for FixError {}

/// Platform boundary for requesting a fresh location fix.  A failed fix is
/// an expected, recoverable outcome, never a reason to abort activation.
pub trait FixProvider {
    fn current_fix(&self) -> Result<Point, FixError>;
}

/// A provider with no device backing it, e.g. on the server side where the
/// client is expected to send its own coordinates.
pub struct NoFix;

impl FixProvider for NoFix {
    fn current_fix(&self) -> Result<Point, FixError> {
        Err(FixError::Unavailable("no fix provider".to_string()))
    }
}

/// Resolve the coordinate to attach to an alert: last-known fix, then a
/// fresh fix, then the campus fallback.  Infallible by design so an alert
/// can always be dispatched.
pub fn resolve_alert_location(last_known: Option<Point>, fix: &dyn FixProvider) -> Point {
    if let Some(p) = last_known {
        return p;
    }
    match fix.current_fix() {
        Ok(p) => p,
        Err(e) => {
            crate::hlog!("sos: could not get a fix ({}), using campus fallback", e);
            SOS_FALLBACK_POINT
        }
    }
}

/// Outcome of a completed activation, for informational display.  The
/// contacts are not paged by this system; the caller shows the count and
/// names so the user can reach out directly.
#[derive(Debug, Clone, Serialize)]
pub struct SosActivation {
    pub alert_id: i64,
    pub location: Point,
    pub contact_count: usize,
    pub contacts: Vec<EmergencyContactRow>,
}

/// Dispatch one SOS alert: resolve a location, insert a single alert row,
/// and collect the emergency-contact fan-out for display.
pub fn activate(
    storage: &Storage,
    user_id: &str,
    last_known: Option<Point>,
    fix: &dyn FixProvider,
    message: &str,
) -> Result<SosActivation, StorageError> {
    let location = resolve_alert_location(last_known, fix);

    let alert_id =
        storage.insert_sos_alert(user_id, location.latitude, location.longitude, message)?;

    let contacts = storage.list_contacts(user_id)?;
    crate::hlog!(
        "sos: {} dispatched by {} at ({:.4}, {:.4}), {} contact(s) on file",
        crate::logging::alert_id(alert_id),
        crate::logging::user_id(user_id),
        location.latitude,
        location.longitude,
        contacts.len()
    );

    Ok(SosActivation {
        alert_id,
        location,
        contact_count: contacts.len(),
        contacts,
    })
}

/// Cancel an alert.  A status transition, never a delete.
pub fn cancel(storage: &Storage, alert_id: i64) -> Result<(), StorageError> {
    storage.update_sos_status(alert_id, "cancelled")?;
    crate::hlog!("sos: {} cancelled", crate::logging::alert_id(alert_id));
    Ok(())
}

pub fn list_active(storage: &Storage, user_id: &str) -> Result<Vec<SosAlertRow>, StorageError> {
    storage.list_active_sos_alerts(user_id)
}

// ---------------------------------------------------------------------------
// Confirmation prompt
// ---------------------------------------------------------------------------

/// Action chosen from a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    Confirm,
    Dismiss,
}

/// Platform-abstracted confirmation prompt: present a title and message
/// with one or two actions and report what the user chose.  UI toolkits
/// implement this; tests use a canned implementation.
pub trait ConfirmPrompt {
    fn confirm(&self, title: &str, message: &str) -> PromptAction;
}

/// Build the post-activation confirmation text, naming up to three
/// emergency contacts.
pub fn confirmation_message(activation: &SosActivation) -> String {
    if activation.contacts.is_empty() {
        return "Your emergency alert has been recorded.\n\n\
                No emergency contacts set up. Add contacts from your profile."
            .to_string();
    }
    let names: Vec<&str> = activation
        .contacts
        .iter()
        .take(3)
        .map(|c| c.name.as_str())
        .collect();
    let ellipsis = if activation.contact_count > 3 { "..." } else { "" };
    format!(
        "Your emergency alert has been recorded.\n\n\
         Emergency contacts ({}): {}{}\n\n\
         Please contact them directly if you need immediate help.",
        activation.contact_count,
        names.join(", "),
        ellipsis
    )
}
