//! # tide-auth
//!
//! Session lifecycle management for the Tidegate dashboard.
//!
//! Turns a one-time login link into a live session, keeps the short-lived
//! access credential fresh with a background renewal timer (`tokio`), and
//! degrades safely when credentials are invalid, expired, or revoked.
//! Credentials persist across restarts via the OS keychain (`keyring`) with a
//! file fallback; the auth service is reached over HTTP (`reqwest`).
//!
//! The manager consumes two injected collaborators — a [`Transport`] and a
//! [`CredentialStore`] — and exposes a `{user, authenticated, loading}`
//! snapshot plus four operations (`initialize`, `verify_login_link`,
//! `refresh`, `logout`) for route guards and request builders. How callers
//! attach the access credential to outbound requests is their business.
//!
//! ```no_run
//! use tide_auth::SessionManager;
//! use tide_config::TideConfig;
//!
//! # async fn run() -> Result<(), tide_auth::AuthError> {
//! let config = TideConfig::load_with_dotenv().expect("config");
//! let sessions = SessionManager::from_config(&config.auth)?;
//!
//! let state = sessions.initialize().await;
//! if !state.authenticated {
//!     // Send the user to the login-link flow, then:
//!     sessions.verify_login_link("one-time-token", "user@example.org").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod manager;
pub mod schedule;
pub mod session;
pub mod store;
pub mod transport;

pub use error::AuthError;
pub use http::HttpTransport;
pub use manager::{DEFAULT_SESSION_SECS, SessionManager};
pub use session::{Session, SessionPhase, SessionSnapshot};
pub use store::{CredentialKey, CredentialStore, KeyringStore, MemoryStore};
pub use transport::{
    ExchangeFailure, LoginGrant, RefreshGrant, Transport, TransportError, VerifiedSession,
};
