//! Showreel error types

use std::time::Duration;

/// Showreel error types
#[derive(Debug, thiserror::Error)]
pub enum ShowreelError {
    // Remote/transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    /// The remote service refused the prompt on content-safety grounds.
    /// Never retried at the same specificity — the fallback ladder moves
    /// to a more generic tier instead.
    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response from model")]
    EmptyResponse,

    // Configuration errors
    #[error("no credentials configured")]
    MissingCredentials,

    #[error("configuration error: {0}")]
    Configuration(String),

    // Broker-local errors
    /// The circuit breaker is in cooldown; new work is rejected at
    /// admission without consuming a remote-call attempt.
    #[error("circuit open, cooling down after quota exhaustion")]
    CircuitOpen,

    #[error("request canceled before execution")]
    Canceled,

    #[error("storage error: {0}")]
    Storage(String),
}

impl ShowreelError {
    /// Whether this error is transient and worth retrying at the same tier.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(_) | Self::RateLimited { .. })
    }

    /// Whether this error signals quota exhaustion.
    ///
    /// Rate-limit failures are the only class that trips the queue's
    /// circuit breaker; everything else escalates the fallback ladder
    /// without pausing the queue.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for Showreel operations
pub type Result<T> = std::result::Result<T, ShowreelError>;
