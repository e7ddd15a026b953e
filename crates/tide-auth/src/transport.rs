//! Transport contract for the auth service.
//!
//! The session manager consumes these four operations and never performs
//! network I/O itself. Each operation returns a tagged result: a success
//! struct with required fields, or a [`TransportError`] naming why the
//! service refused — "refresh credential present or not" is a type-level
//! branch, not an ad hoc optional-field check.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tide_core::UserProfile;

/// Why the auth service refused a login-link exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeFailure {
    /// The link outlived its validity window.
    Expired,
    /// The single-use token was already exchanged.
    AlreadyUsed,
    /// The token was issued to a different email.
    EmailMismatch,
}

impl ExchangeFailure {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::AlreadyUsed => "already_used",
            Self::EmailMismatch => "email_mismatch",
        }
    }

    /// Parse the auth service's reason code, if recognized.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "expired" => Some(Self::Expired),
            "already_used" => Some(Self::AlreadyUsed),
            "email_mismatch" => Some(Self::EmailMismatch),
            _ => None,
        }
    }
}

impl fmt::Display for ExchangeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The service could not be reached. Transient — the next scheduled or
    /// user-triggered attempt will try again.
    #[error("auth service unreachable: {0}")]
    Unreachable(String),

    /// The service examined the credential and refused it. Terminal for the
    /// current session.
    #[error("credential rejected: {reason}")]
    Rejected { reason: String },

    /// A login-link exchange was refused. Never clears a pre-existing session.
    #[error("login link exchange failed: {reason}")]
    ExchangeFailed { reason: ExchangeFailure },

    /// The response body could not be decoded.
    #[error("malformed auth service response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether the failure is a connectivity problem rather than a verdict.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Successful session check: the service vouched for the access credential.
#[derive(Debug, Clone)]
pub struct VerifiedSession {
    pub user: UserProfile,
}

/// Successful login-link exchange.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub access_credential: String,
    /// `None` when the service runs without refresh rotation.
    pub refresh_credential: Option<String>,
    pub user: UserProfile,
    pub expires_in_secs: u64,
}

/// Successful refresh. Carries no user — the profile snapshot is unchanged.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub access_credential: String,
    /// Rotated refresh credential, or `None` when the old one stays valid.
    pub refresh_credential: Option<String>,
    pub expires_in_secs: u64,
}

/// The auth service exchange, performed over whatever wire the implementation
/// chooses. See [`crate::http::HttpTransport`] for the production HTTP one.
pub trait Transport: Send + Sync {
    /// Validate an access credential and fetch the profile behind it.
    fn check_session(
        &self,
        access_credential: &str,
    ) -> impl Future<Output = Result<VerifiedSession, TransportError>> + Send;

    /// Exchange a one-time login token for a live session. Consumes the token
    /// server-side on first success.
    fn exchange_login_token(
        &self,
        token: &str,
        email: &str,
    ) -> impl Future<Output = Result<LoginGrant, TransportError>> + Send;

    /// Trade a refresh credential for a new access credential (and possibly a
    /// rotated refresh credential).
    fn refresh_session(
        &self,
        refresh_credential: &str,
    ) -> impl Future<Output = Result<RefreshGrant, TransportError>> + Send;

    /// Invalidate the session server-side. Best-effort from the manager's
    /// point of view: local cleanup proceeds regardless of the outcome.
    fn invalidate_session(
        &self,
        access_credential: Option<&str>,
        refresh_credential: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn check_session(
        &self,
        access_credential: &str,
    ) -> impl Future<Output = Result<VerifiedSession, TransportError>> + Send {
        self.as_ref().check_session(access_credential)
    }

    fn exchange_login_token(
        &self,
        token: &str,
        email: &str,
    ) -> impl Future<Output = Result<LoginGrant, TransportError>> + Send {
        self.as_ref().exchange_login_token(token, email)
    }

    fn refresh_session(
        &self,
        refresh_credential: &str,
    ) -> impl Future<Output = Result<RefreshGrant, TransportError>> + Send {
        self.as_ref().refresh_session(refresh_credential)
    }

    fn invalidate_session(
        &self,
        access_credential: Option<&str>,
        refresh_credential: Option<&str>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        self.as_ref()
            .invalidate_session(access_credential, refresh_credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn exchange_failure_codes_round_trip() {
        for failure in [
            ExchangeFailure::Expired,
            ExchangeFailure::AlreadyUsed,
            ExchangeFailure::EmailMismatch,
        ] {
            assert_eq!(ExchangeFailure::from_code(failure.as_str()), Some(failure));
        }
        assert_eq!(ExchangeFailure::from_code("rate_limited"), None);
    }

    #[test]
    fn only_unreachable_is_transient() {
        assert!(TransportError::Unreachable("timeout".into()).is_transient());
        assert!(
            !TransportError::Rejected {
                reason: "revoked".into()
            }
            .is_transient()
        );
        assert!(
            !TransportError::ExchangeFailed {
                reason: ExchangeFailure::Expired
            }
            .is_transient()
        );
    }
}
