//! Session lifecycle manager.
//!
//! Owns the state machine, the renewal timer, and the session record. All
//! credential mutations go through one gate, so `verify_login_link`,
//! `refresh`, `logout`, and `initialize` each run to completion before the
//! next starts; `refresh` takes the gate with `try_lock` as its in-flight
//! flag, so a manually triggered refresh cannot double-rotate the refresh
//! credential against the scheduled one.
//!
//! There is at most one outstanding renewal timer per manager: arming a new
//! one aborts the old, and aborting is the only cancellation primitive.

use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, TimeDelta, Utc};
use tide_core::{Role, UserProfile};
use tokio::task::JoinHandle;

use crate::error::AuthError;
use crate::http::HttpTransport;
use crate::schedule;
use crate::session::{Session, SessionPhase, SessionSnapshot};
use crate::store::{CredentialKey, CredentialStore, KeyringStore};
use crate::transport::{RefreshGrant, Transport};

/// Assumed access-credential lifetime when the session-check endpoint
/// succeeds — the endpoint does not echo remaining lifetime, so the renewal
/// schedule works from this value.
pub const DEFAULT_SESSION_SECS: u64 = 8 * 3600;

/// The session lifecycle manager.
///
/// Cheap to clone; clones share one session, one store, and one timer.
/// Dropping the last clone aborts any pending renewal.
pub struct SessionManager<T, S> {
    inner: Arc<Inner<T, S>>,
}

impl<T, S> Clone for SessionManager<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T, S> {
    transport: T,
    store: S,
    default_session_secs: u64,
    state: Mutex<ManagerState>,
    timer: Mutex<Option<JoinHandle<()>>>,
    op_gate: tokio::sync::Mutex<()>,
}

#[derive(Debug)]
struct ManagerState {
    phase: SessionPhase,
    session: Option<Session>,
}

impl<T, S> Drop for Inner<T, S> {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock()
            && let Some(handle) = timer.take()
        {
            handle.abort();
        }
    }
}

fn expiry_from_now(expires_in_secs: u64) -> DateTime<Utc> {
    // An absurd lifetime from the server saturates to the far future instead
    // of overflowing chrono's representable range.
    let now = Utc::now();
    i64::try_from(expires_in_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl SessionManager<HttpTransport, KeyringStore> {
    /// Production wiring: HTTP transport and OS keychain store, both from
    /// `tide-config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` if no auth service base URL is set.
    pub fn from_config(config: &tide_config::AuthConfig) -> Result<Self, AuthError> {
        let transport = HttpTransport::from_config(config)?;
        let store = KeyringStore::from_config(config);
        Ok(Self::with_session_lifetime(
            transport,
            store,
            config.default_session_secs,
        ))
    }
}

impl<T, S> SessionManager<T, S>
where
    T: Transport + 'static,
    S: CredentialStore + 'static,
{
    /// Manager with the stock assumed session lifetime.
    #[must_use]
    pub fn new(transport: T, store: S) -> Self {
        Self::with_session_lifetime(transport, store, DEFAULT_SESSION_SECS)
    }

    /// Manager with a custom assumed session lifetime for the
    /// check-session path, in seconds.
    #[must_use]
    pub fn with_session_lifetime(transport: T, store: S, default_session_secs: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                default_session_secs,
                state: Mutex::new(ManagerState {
                    phase: SessionPhase::Unauthenticated,
                    session: None,
                }),
                timer: Mutex::new(None),
                op_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Resolve the startup session state. Called once by the embedding
    /// application; later calls are ignored.
    ///
    /// Every branch converges to authenticated or unauthenticated before
    /// returning — never a transient phase. One transport call in the common
    /// case, at most two on the check-then-refresh fallback. Errors are
    /// swallowed into the returned state; this runs with no interactive
    /// caller to catch them.
    pub async fn initialize(&self) -> SessionSnapshot {
        let _gate = self.inner.op_gate.lock().await;

        {
            let Ok(mut state) = self.inner.state.lock() else {
                return self.snapshot();
            };
            if state.phase != SessionPhase::Unauthenticated {
                tracing::warn!("initialize called more than once; ignoring");
                drop(state);
                return self.snapshot();
            }
            state.phase = SessionPhase::Authenticating;
        }

        let access = self.inner.store.get(CredentialKey::Access);
        let refresh = self.inner.store.get(CredentialKey::Refresh);

        match (access, refresh) {
            (Some(access), refresh) => match self.inner.transport.check_session(&access).await {
                Ok(verified) => {
                    tracing::debug!(user = %verified.user.email, "stored session verified");
                    if let Ok(json) = serde_json::to_string(&verified.user) {
                        self.inner.store.set(CredentialKey::Profile, &json);
                    }
                    let expires_in = self.inner.default_session_secs;
                    self.install_session(Session {
                        access_credential: access,
                        refresh_credential: refresh,
                        user: Some(verified.user),
                        expires_at: expiry_from_now(expires_in),
                    });
                    self.schedule_refresh(expires_in);
                }
                Err(error) => {
                    tracing::debug!(%error, "stored access credential rejected");
                    if refresh.is_some() {
                        let _ = self.refresh_locked().await;
                    } else {
                        self.clear_session();
                    }
                }
            },
            (None, Some(_)) => {
                let _ = self.refresh_locked().await;
            }
            (None, None) => self.set_phase(SessionPhase::Unauthenticated),
        }

        self.snapshot()
    }

    /// Exchange a one-time login link for a live session.
    ///
    /// The token is consumed server-side on first success, so a retry after
    /// success must fail. A refused exchange is surfaced to the caller and
    /// leaves any pre-existing session untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Transport` with `TransportError::ExchangeFailed`
    /// when the link is expired, already used, or issued to another email.
    pub async fn verify_login_link(
        &self,
        token: &str,
        email: &str,
    ) -> Result<SessionSnapshot, AuthError> {
        let _gate = self.inner.op_gate.lock().await;

        let grant = self.inner.transport.exchange_login_token(token, email).await?;
        tracing::info!(user = %grant.user.email, "login link verified");

        let expires_in = grant.expires_in_secs;
        self.inner.store.set(CredentialKey::Access, &grant.access_credential);
        match grant.refresh_credential.as_deref() {
            Some(refresh) => self.inner.store.set(CredentialKey::Refresh, refresh),
            // A stale credential from an older session must not linger.
            None => self.inner.store.clear(CredentialKey::Refresh),
        }
        if let Ok(json) = serde_json::to_string(&grant.user) {
            self.inner.store.set(CredentialKey::Profile, &json);
        }

        self.install_session(Session {
            access_credential: grant.access_credential,
            refresh_credential: grant.refresh_credential,
            user: Some(grant.user),
            expires_at: expiry_from_now(expires_in),
        });
        self.schedule_refresh(expires_in);

        Ok(self.snapshot())
    }

    /// Rotate credentials via the refresh credential.
    ///
    /// Without a refresh credential this resolves to `false` with no
    /// transport call. If a refresh is already in flight, no second rotation
    /// starts and the current authentication state is returned. Any transport
    /// failure clears the whole session — the server is the sole authority,
    /// and there is no retry loop.
    pub async fn refresh(&self) -> bool {
        let Ok(_gate) = self.inner.op_gate.try_lock() else {
            tracing::debug!("refresh already in flight; skipping");
            return self.snapshot().authenticated;
        };
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> bool {
        let in_memory = self.inner.state.lock().ok().and_then(|state| {
            state
                .session
                .as_ref()
                .and_then(|s| s.refresh_credential.clone())
        });
        let Some(refresh_credential) =
            in_memory.or_else(|| self.inner.store.get(CredentialKey::Refresh))
        else {
            tracing::debug!("no refresh credential; renewal impossible");
            if let Ok(mut state) = self.inner.state.lock()
                && state.session.is_none()
            {
                state.phase = SessionPhase::Unauthenticated;
            }
            return false;
        };

        if let Ok(mut state) = self.inner.state.lock()
            && state.phase == SessionPhase::Authenticated
        {
            state.phase = SessionPhase::Refreshing;
        }

        match self.inner.transport.refresh_session(&refresh_credential).await {
            Ok(grant) => {
                self.apply_refresh_grant(grant);
                true
            }
            Err(error) => {
                tracing::warn!(%error, "credential refresh failed; clearing session");
                self.clear_session();
                false
            }
        }
    }

    fn apply_refresh_grant(&self, grant: RefreshGrant) {
        // Persist the rotated refresh credential before the old in-memory
        // reference is dropped: a crash mid-update must not leave the store
        // with no valid credential when one was already issued.
        if let Some(new_refresh) = grant.refresh_credential.as_deref() {
            self.inner.store.set(CredentialKey::Refresh, new_refresh);
        }
        self.inner.store.set(CredentialKey::Access, &grant.access_credential);

        let expires_in = grant.expires_in_secs;
        let expires_at = expiry_from_now(expires_in);
        if let Ok(mut state) = self.inner.state.lock() {
            match state.session.as_mut() {
                Some(session) => {
                    session.access_credential = grant.access_credential;
                    if grant.refresh_credential.is_some() {
                        session.refresh_credential = grant.refresh_credential;
                    }
                    session.expires_at = expires_at;
                }
                // Startup-from-refresh path: no session yet; the profile, if
                // any, comes from the store cache.
                None => {
                    let refresh_credential = grant
                        .refresh_credential
                        .or_else(|| self.inner.store.get(CredentialKey::Refresh));
                    state.session = Some(Session {
                        access_credential: grant.access_credential,
                        refresh_credential,
                        user: self.cached_profile(),
                        expires_at,
                    });
                }
            }
            state.phase = SessionPhase::Authenticated;
        }

        self.schedule_refresh(expires_in);
    }

    /// Arm the renewal timer for a credential valid for `expires_in_secs`.
    ///
    /// Idempotent: any previously armed timer is aborted first, so two calls
    /// in a row leave exactly one live timer. When it fires it invokes
    /// [`Self::refresh`]; if that fails the manager is unauthenticated and no
    /// further timer is armed — the next chance to re-authenticate is the
    /// user's next interaction.
    pub fn schedule_refresh(&self, expires_in_secs: u64) {
        let delay = schedule::renewal_delay(expires_in_secs);
        tracing::debug!(?delay, "arming renewal timer");

        // The deadline is anchored here, at arming time. Anchoring inside the
        // task would measure from its first poll instead.
        let deadline = tokio::time::Instant::now() + delay;
        let weak: Weak<Inner<T, S>> = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = weak.upgrade() else { return };
            let manager = SessionManager { inner };
            if !manager.refresh().await {
                tracing::warn!("scheduled credential renewal failed");
            }
        });

        if let Ok(mut timer) = self.inner.timer.lock() {
            if let Some(old) = timer.replace(handle) {
                old.abort();
            }
        } else {
            handle.abort();
        }
    }

    /// End the session.
    ///
    /// The server-side invalidation is best-effort; local cleanup (timer,
    /// store, session record) is unconditional and never throws, so the
    /// manager is unauthenticated when this returns even on a dead network.
    ///
    /// # Errors
    ///
    /// Surfaces the transport error from the invalidation call, after local
    /// cleanup has already completed.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let _gate = self.inner.op_gate.lock().await;

        let (access, refresh) = self.inner.state.lock().map_or((None, None), |state| {
            state.session.as_ref().map_or((None, None), |s| {
                (
                    Some(s.access_credential.clone()),
                    s.refresh_credential.clone(),
                )
            })
        });
        let access = access.or_else(|| self.inner.store.get(CredentialKey::Access));
        let refresh = refresh.or_else(|| self.inner.store.get(CredentialKey::Refresh));

        let result = self
            .inner
            .transport
            .invalidate_session(access.as_deref(), refresh.as_deref())
            .await;

        if let Err(error) = &result {
            tracing::warn!(%error, "server-side invalidation failed; clearing locally anyway");
        }
        self.clear_session();

        result.map_err(AuthError::from)
    }

    /// Point-in-time state for route guards and request builders.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.lock().map_or(
            SessionSnapshot {
                user: None,
                authenticated: false,
                loading: false,
            },
            |state| SessionSnapshot {
                user: state.session.as_ref().and_then(|s| s.user.clone()),
                authenticated: state.session.is_some(),
                loading: state.phase.is_transient(),
            },
        )
    }

    /// The current access credential, for outbound request builders.
    #[must_use]
    pub fn access_credential(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .ok()
            .and_then(|state| state.session.as_ref().map(|s| s.access_credential.clone()))
    }

    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    #[must_use]
    pub fn is_editor(&self) -> bool {
        self.has_role(Role::Editor)
    }

    fn has_role(&self, required: Role) -> bool {
        self.inner.state.lock().ok().is_some_and(|state| {
            state
                .session
                .as_ref()
                .and_then(|s| s.user.as_ref())
                .is_some_and(|user| user.role.grants(required))
        })
    }

    fn cached_profile(&self) -> Option<UserProfile> {
        let json = self.inner.store.get(CredentialKey::Profile)?;
        match serde_json::from_str(&json) {
            Ok(profile) => Some(profile),
            Err(error) => {
                tracing::warn!(%error, "discarding unreadable cached profile");
                None
            }
        }
    }

    fn install_session(&self, session: Session) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.session = Some(session);
            state.phase = SessionPhase::Authenticated;
        }
    }

    fn set_phase(&self, phase: SessionPhase) {
        if let Ok(mut state) = self.inner.state.lock() {
            state.phase = phase;
        }
    }

    fn cancel_timer(&self) {
        if let Ok(mut timer) = self.inner.timer.lock()
            && let Some(handle) = timer.take()
        {
            handle.abort();
        }
    }

    fn clear_session(&self) {
        self.cancel_timer();
        for key in CredentialKey::ALL {
            self.inner.store.clear(key);
        }
        if let Ok(mut state) = self.inner.state.lock() {
            state.session = None;
            state.phase = SessionPhase::Unauthenticated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_saturates_on_absurd_lifetimes() {
        assert_eq!(expiry_from_now(u64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(
            expiry_from_now(u64::try_from(i64::MAX).unwrap_or(u64::MAX)),
            DateTime::<Utc>::MAX_UTC
        );
    }

    #[test]
    fn expiry_tracks_ordinary_lifetimes() {
        let before = Utc::now();
        let expiry = expiry_from_now(3_600);
        assert!(expiry >= before + TimeDelta::seconds(3_600));
        assert!(expiry <= Utc::now() + TimeDelta::seconds(3_600));
    }
}
