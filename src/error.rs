use std::{fmt, time::Duration};

/// Why a caller-side wait ended before the operation completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CancelCause {
    /// The caller's deadline passed.
    DeadlineExpired,
    /// The caller's cancellation token fired.
    Cancelled,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineExpired => f.write_str("deadline expired"),
            Self::Cancelled => f.write_str("cancelled by caller"),
        }
    }
}

/// Coarse error taxonomy exposed to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Disabled,
    Closed,
    CancellationExpired,
    TransientNetwork,
    RetriesExhausted,
    Permanent,
}

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The client was built with `enabled = false`; nothing was sent.
    #[error("client is disabled")]
    Disabled,
    /// The client has been closed; nothing was sent.
    #[error("client is closed")]
    Closed,
    /// The caller's deadline or cancellation fired while queued, in flight or backing off.
    #[error("request cancelled: {0}")]
    Cancelled(CancelCause),
    /// A single attempt exceeded its `request_timeout` budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Every attempt failed with a transient error.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of network attempts performed.
        attempts: u32,
        /// Error from the final attempt.
        #[source]
        last: Box<ServiceError>,
    },
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// Response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// Request could not be built (bad path, header or body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Client configuration or options rejected at build time.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Returns `true` when retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        crate::classify::is_transient(self)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Disabled => ErrorKind::Disabled,
            Self::Closed => ErrorKind::Closed,
            Self::Cancelled(_) => ErrorKind::CancellationExpired,
            Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
            other if other.is_transient() => ErrorKind::TransientNetwork,
            _ => ErrorKind::Permanent,
        }
    }
}
