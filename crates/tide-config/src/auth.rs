//! Auth service configuration.

use serde::{Deserialize, Serialize};

/// Default outbound request timeout.
const fn default_request_timeout_secs() -> u64 {
    30
}

/// Default assumed access-credential lifetime when the session-check endpoint
/// succeeds. The endpoint does not echo remaining lifetime, so the renewal
/// schedule works from this value; it must track the server-side constant.
const fn default_session_secs() -> u64 {
    8 * 3600
}

fn default_keyring_service() -> String {
    "tidegate".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Base URL of the auth service (e.g. `https://api.fisheries.example`).
    #[serde(default)]
    pub base_url: String,

    /// Timeout applied to every auth service request, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Assumed session lifetime on the check-session path, in seconds.
    #[serde(default = "default_session_secs")]
    pub default_session_secs: u64,

    /// OS keychain service name for stored credentials.
    #[serde(default = "default_keyring_service")]
    pub keyring_service: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            request_timeout_secs: default_request_timeout_secs(),
            default_session_secs: default_session_secs(),
            keyring_service: default_keyring_service(),
        }
    }
}

impl AuthConfig {
    /// Check if the auth config has the minimum required fields.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
    }
}
