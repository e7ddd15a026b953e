//! Renewal scheduling rule.
//!
//! The renewal timer fires ahead of credential expiry so the refresh completes
//! while the old access credential is still valid. The delay never drops below
//! a floor, so a credential already inside the lead window still gets one
//! scheduled attempt instead of an immediate (or negative) fire.

use std::time::Duration;

/// Seconds before expiry at which renewal should run.
pub const RENEWAL_LEAD_SECS: u64 = 300;

/// Floor on the renewal delay.
pub const MIN_RENEWAL_DELAY: Duration = Duration::from_millis(30_000);

/// Ceiling on the renewal delay. An absurd lifetime from the server must not
/// push the deadline past what the runtime's timer wheel can represent.
pub const MAX_RENEWAL_DELAY: Duration = Duration::from_secs(30 * 24 * 3600);

/// Delay before the renewal timer fires for a credential valid for
/// `expires_in_secs`: `max((expires_in_secs - 300) * 1000 ms, 30_000 ms)`,
/// capped at [`MAX_RENEWAL_DELAY`].
#[must_use]
pub fn renewal_delay(expires_in_secs: u64) -> Duration {
    Duration::from_secs(expires_in_secs.saturating_sub(RENEWAL_LEAD_SECS))
        .clamp(MIN_RENEWAL_DELAY, MAX_RENEWAL_DELAY)
}
