use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A transport operation failed. Callers can match on the inner
    /// `TransportError` to distinguish connectivity problems from rejected
    /// credentials or a refused login-link exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("auth not configured: {0}")]
    NotConfigured(String),

    #[error("{0}")]
    Other(String),
}
