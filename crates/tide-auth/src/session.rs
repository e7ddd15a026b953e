//! In-memory session record and the state exposed to embedders.

use chrono::{DateTime, Utc};
use tide_core::UserProfile;

/// The authoritative in-memory session record.
///
/// Exclusively owned and mutated by the session manager. `expires_at` is a
/// derived wall-clock instant used only for renewal scheduling — never for
/// security decisions, which stay with the auth service.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque short-lived token authorizing API calls.
    pub access_credential: String,
    /// Opaque longer-lived token exchanged for new access credentials.
    /// Single-use under rotation; `None` when the service issued none.
    pub refresh_credential: Option<String>,
    /// Profile snapshot for authorization display. `None` on the
    /// refresh-only startup path until a check or login supplies one.
    pub user: Option<UserProfile>,
    /// When the access credential is expected to lapse.
    pub expires_at: DateTime<Utc>,
}

/// Lifecycle phase of the manager.
///
/// ```text
/// unauthenticated → authenticating → authenticated ⇄ refreshing
/// ```
///
/// Any phase drops back to `Unauthenticated` on unrecoverable failure. The
/// transient phases are never exposed beyond the snapshot's `loading` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Refreshing,
}

impl SessionPhase {
    /// Whether the phase is an in-flight transition.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Authenticating | Self::Refreshing)
    }
}

/// Point-in-time state handed to route guards and request builders.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Profile of the signed-in user, if known.
    pub user: Option<UserProfile>,
    /// Whether a live session exists.
    pub authenticated: bool,
    /// Whether a lifecycle operation is in flight.
    pub loading: bool,
}
