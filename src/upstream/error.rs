//! Errors raised by the leaf lookup clients.

use thiserror::Error;

use crate::resilience::is_deadline;

/// Failure of a single outbound lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    /// Connection refused, reset, DNS failure, body read failure.
    #[error("{target} request failed: {source}")]
    Transport {
        target: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The fixed deadline elapsed.
    #[error("{target} timed out: {source}")]
    Timeout {
        target: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status other than a credential rejection.
    #[error("{target} returned status {status}: {body}")]
    Status {
        target: &'static str,
        status: u16,
        body: String,
    },

    /// The provider refused the configured credential (401/403).
    #[error("{target} rejected the credential with status {status}")]
    Unauthorized { target: &'static str, status: u16 },

    /// The response body did not have the expected shape.
    #[error("{target} response could not be decoded: {reason}")]
    Decode { target: &'static str, reason: String },
}

impl LookupError {
    /// Map a reqwest send/read failure, separating deadline expiry.
    pub fn from_reqwest(target: &'static str, source: reqwest::Error) -> Self {
        if is_deadline(&source) {
            LookupError::Timeout { target, source }
        } else if source.is_decode() {
            LookupError::Decode {
                target,
                reason: source.to_string(),
            }
        } else {
            LookupError::Transport { target, source }
        }
    }

    /// True when the dependency answered but with an unexpected shape.
    pub fn is_decode(&self) -> bool {
        matches!(self, LookupError::Decode { .. })
    }

    pub fn target(&self) -> &'static str {
        match self {
            LookupError::Transport { target, .. }
            | LookupError::Timeout { target, .. }
            | LookupError::Status { target, .. }
            | LookupError::Unauthorized { target, .. }
            | LookupError::Decode { target, .. } => target,
        }
    }

    /// Short outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            LookupError::Transport { .. } => "transport",
            LookupError::Timeout { .. } => "timeout",
            LookupError::Status { .. } => "status",
            LookupError::Unauthorized { .. } => "unauthorized",
            LookupError::Decode { .. } => "decode",
        }
    }
}
