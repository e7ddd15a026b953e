//! HTTP transport against the dashboard auth service.
//!
//! Calls the auth service directly via `reqwest`. Endpoints:
//!
//! - `POST /auth/verify-login` — exchange a one-time login token
//! - `GET  /auth/session` — validate the current access credential
//! - `POST /auth/refresh` — rotate credentials
//! - `POST /auth/logout` — invalidate the session server-side
//!
//! Status codes map onto the [`TransportError`] taxonomy: connection failures
//! are `Unreachable`, 401/403 are `Rejected`, and verify-login failures carry
//! the service's reason code as an [`ExchangeFailure`].

use std::time::Duration;

use serde::Deserialize;
use tide_core::UserProfile;

use crate::error::AuthError;
use crate::transport::{
    ExchangeFailure, LoginGrant, RefreshGrant, Transport, TransportError, VerifiedSession,
};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Transport against `base_url` with the default client.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_trailing_slash(base_url.into()),
        }
    }

    /// Transport configured from `tide-config`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` if no base URL is set, or
    /// `AuthError::Other` if the HTTP client cannot be built.
    pub fn from_config(config: &tide_config::AuthConfig) -> Result<Self, AuthError> {
        if !config.is_configured() {
            return Err(AuthError::NotConfigured(
                "auth.base_url is empty — set TIDEGATE_AUTH__BASE_URL or config.toml".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuthError::Other(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: trim_trailing_slash(config.base_url.clone()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn trim_trailing_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

// --- Wire types (camelCase, matching the auth service) ---

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckSessionBody {
    authenticated: bool,
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginGrantBody {
    token: String,
    refresh_token: Option<String>,
    user: UserProfile,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshGrantBody {
    token: String,
    refresh_token: Option<String>,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Map a non-success response onto the transport taxonomy.
///
/// `exchange` marks the verify-login endpoint, whose client errors carry a
/// reason code for the one-time token rather than a credential verdict.
fn classify(status: reqwest::StatusCode, body: &str, exchange: bool) -> TransportError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.error.clone());
    let message = parsed
        .and_then(|b| b.message)
        .or_else(|| code.clone())
        .unwrap_or_else(|| format!("HTTP {status}"));

    if exchange && status.is_client_error() {
        if let Some(reason) = code.as_deref().and_then(ExchangeFailure::from_code) {
            return TransportError::ExchangeFailed { reason };
        }
        // A 410 Gone without a reason code means the token is spent.
        if status == reqwest::StatusCode::GONE {
            return TransportError::ExchangeFailed {
                reason: ExchangeFailure::AlreadyUsed,
            };
        }
    }

    match status {
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            TransportError::Rejected { reason: message }
        }
        _ if status.is_server_error() => TransportError::Unreachable(message),
        _ => TransportError::Rejected { reason: message },
    }
}

fn send_error(error: &reqwest::Error) -> TransportError {
    TransportError::Unreachable(error.to_string())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
    exchange: bool,
) -> Result<T, TransportError> {
    let status = resp.status();
    let body = resp.text().await.map_err(|e| send_error(&e))?;
    if !status.is_success() {
        return Err(classify(status, &body, exchange));
    }
    serde_json::from_str(&body).map_err(|e| TransportError::Malformed(e.to_string()))
}

impl Transport for HttpTransport {
    async fn check_session(
        &self,
        access_credential: &str,
    ) -> Result<VerifiedSession, TransportError> {
        let resp = self
            .client
            .get(self.url("/auth/session"))
            .bearer_auth(access_credential)
            .send()
            .await
            .map_err(|e| send_error(&e))?;

        let body: CheckSessionBody = read_json(resp, false).await?;
        match (body.authenticated, body.user) {
            (true, Some(user)) => Ok(VerifiedSession { user }),
            (true, None) => Err(TransportError::Malformed(
                "authenticated response without user".into(),
            )),
            (false, _) => Err(TransportError::Rejected {
                reason: "session not authenticated".into(),
            }),
        }
    }

    async fn exchange_login_token(
        &self,
        token: &str,
        email: &str,
    ) -> Result<LoginGrant, TransportError> {
        let resp = self
            .client
            .post(self.url("/auth/verify-login"))
            .json(&serde_json::json!({ "token": token, "email": email }))
            .send()
            .await
            .map_err(|e| send_error(&e))?;

        let body: LoginGrantBody = read_json(resp, true).await?;
        Ok(LoginGrant {
            access_credential: body.token,
            refresh_credential: body.refresh_token,
            user: body.user,
            expires_in_secs: body.expires_in,
        })
    }

    async fn refresh_session(
        &self,
        refresh_credential: &str,
    ) -> Result<RefreshGrant, TransportError> {
        let resp = self
            .client
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refreshToken": refresh_credential }))
            .send()
            .await
            .map_err(|e| send_error(&e))?;

        let body: RefreshGrantBody = read_json(resp, false).await?;
        Ok(RefreshGrant {
            access_credential: body.token,
            refresh_credential: body.refresh_token,
            expires_in_secs: body.expires_in,
        })
    }

    async fn invalidate_session(
        &self,
        access_credential: Option<&str>,
        refresh_credential: Option<&str>,
    ) -> Result<(), TransportError> {
        let mut request = self
            .client
            .post(self.url("/auth/logout"))
            .json(&serde_json::json!({ "refreshToken": refresh_credential }));
        if let Some(access) = access_credential {
            request = request.bearer_auth(access);
        }
        let resp = request.send().await.map_err(|e| send_error(&e))?;

        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(classify(status, &body, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tide_core::Role;

    #[test]
    fn login_grant_body_parses_with_rotation() {
        let body: LoginGrantBody = serde_json::from_str(
            r#"{
                "token": "acc_1",
                "refreshToken": "ref_1",
                "user": {"id": "usr_1", "email": "a@b.example", "role": "admin"},
                "expiresIn": 28800
            }"#,
        )
        .expect("parse");
        assert_eq!(body.token, "acc_1");
        assert_eq!(body.refresh_token.as_deref(), Some("ref_1"));
        assert_eq!(body.user.role, Role::Admin);
        assert_eq!(body.expires_in, 28_800);
    }

    #[test]
    fn refresh_grant_body_parses_without_rotation() {
        let body: RefreshGrantBody =
            serde_json::from_str(r#"{"token": "acc_2", "expiresIn": 3600}"#).expect("parse");
        assert_eq!(body.token, "acc_2");
        assert_eq!(body.refresh_token, None);
    }

    #[test]
    fn classify_unauthorized_is_rejected() {
        let error = classify(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"message": "token revoked"}"#,
            false,
        );
        assert!(matches!(
            error,
            TransportError::Rejected { reason } if reason == "token revoked"
        ));
    }

    #[test]
    fn classify_server_error_is_unreachable() {
        let error = classify(reqwest::StatusCode::BAD_GATEWAY, "", false);
        assert!(error.is_transient());
    }

    #[test]
    fn classify_exchange_reason_codes() {
        let error = classify(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": "email_mismatch"}"#,
            true,
        );
        assert!(matches!(
            error,
            TransportError::ExchangeFailed {
                reason: ExchangeFailure::EmailMismatch
            }
        ));

        let error = classify(reqwest::StatusCode::GONE, "{}", true);
        assert!(matches!(
            error,
            TransportError::ExchangeFailed {
                reason: ExchangeFailure::AlreadyUsed
            }
        ));
    }

    #[test]
    fn trims_trailing_slashes() {
        let transport = HttpTransport::new("https://api.fisheries.example//");
        assert_eq!(
            transport.url("/auth/session"),
            "https://api.fisheries.example/auth/session"
        );
    }
}
