//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use crate::roles::Role;

/// Denormalized user snapshot for cross-crate passing and display.
///
/// Produced by the auth transport, held by the session manager, consumed by
/// route guards and the dashboard UI. Contains only data fields — the server
/// stays authoritative for permission enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Stable user ID assigned by the auth service.
    pub id: String,
    /// Email the login link was issued to.
    pub email: String,
    /// Role used for authorization display.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_wire_payload() {
        let profile: UserProfile = serde_json::from_str(
            r#"{"id":"usr_42","email":"observer@fisheries.example","role":"editor"}"#,
        )
        .expect("deserialize");
        assert_eq!(profile.id, "usr_42");
        assert_eq!(profile.email, "observer@fisheries.example");
        assert_eq!(profile.role, Role::Editor);
    }

    #[test]
    fn round_trips_through_json() {
        let profile = UserProfile {
            id: "usr_7".into(),
            email: "council@fisheries.example".into(),
            role: Role::SuperAdmin,
        };
        let json = serde_json::to_string(&profile).expect("serialize");
        let back: UserProfile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, profile);
    }
}
