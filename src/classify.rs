//! Transient-vs-permanent error classification.
//!
//! Only transport-level timeouts are retryable. HTTP status codes are never
//! inspected here; mapping 4xx/5xx responses is left to the caller.

use std::error::Error as StdError;

use tokio::time::error::Elapsed;

use crate::ServiceError;

/// Returns `true` if `err`, or any error in its `source()` chain, is a
/// deadline expiry or a network timeout.
///
/// The crate's own terminal errors (disabled, closed, cancelled, retries
/// exhausted) are never transient, even when they wrap a timeout.
pub fn is_transient(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(service) = err.downcast_ref::<ServiceError>() {
            match service {
                ServiceError::Timeout(_) => return true,
                ServiceError::Disabled
                | ServiceError::Closed
                | ServiceError::Cancelled(_)
                | ServiceError::RetriesExhausted { .. } => return false,
                _ => {}
            }
        } else if err.is::<Elapsed>() {
            return true;
        } else if let Some(err) = err.downcast_ref::<reqwest::Error>() {
            if err.is_timeout() {
                return true;
            }
        } else if let Some(err) = err.downcast_ref::<std::io::Error>() {
            if err.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        current = err.source();
    }
    false
}
