//! Error and response types shared by every [`AlertApi`](super::AlertApi)
//! implementation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for safety API operations
///
/// Every variant is recovered at the component boundary: the reconciler,
/// scheduler and state machine report it as an outcome and never panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// No session token is available; no request was attempted
    #[error("not authenticated")]
    Unauthenticated,

    /// Transport-level failure (timeout, DNS, connection reset, unreadable body)
    #[error("network failure: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ApiError {
    /// Whether the owning screen should give up and re-authenticate
    pub fn is_fatal(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ApiError::Rejected {
                status: status.as_u16(),
                message: err.to_string(),
            };
        }
        ApiError::Network(err.to_string())
    }
}

/// Authoritative answer of the toggle endpoint (`POST /sos`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleOutcome {
    /// Whether the caller's alert is active after the toggle
    pub active: bool,
    /// Event that was started or stopped
    #[serde(default)]
    pub event_id: Option<String>,
    /// Human-readable status ("SOS triggered", "SOS stopped")
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned by the server on failures
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub message: String,
}
