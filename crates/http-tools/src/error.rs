//! Error types for `hdx-http-tools`.

use crate::safety::sanitize_reqwest_error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid client or limiter configuration (bad base URL, header, zero capacity).
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// The per-request timeout configured on the client elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// Connection, DNS, TLS or body-read failure.
    #[error("http transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status.
    #[error("API returned {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Timeout(sanitize_reqwest_error(&value))
        } else {
            Self::Transport(sanitize_reqwest_error(&value))
        }
    }
}

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
