use std::future::{pending, Future};

use tokio::time::{sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::{error::CancelCause, Result, ServiceError};

/// Caller-side deadline and cancellation for one logical request.
///
/// Both are honored while waiting for a concurrency slot, during each network
/// attempt and during the backoff between attempts. An empty context never
/// expires; each attempt is still bounded by the policy's request timeout.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context is already done, if it is.
    pub fn done(&self) -> Option<CancelCause> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(CancelCause::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            return Some(CancelCause::DeadlineExpired);
        }
        None
    }

    /// Drives `fut` until it completes or the context is done, whichever is first.
    ///
    /// `fut` is dropped on cancellation, so anything it holds is released.
    pub(crate) async fn run<F: Future>(&self, fut: F) -> Result<F::Output> {
        if let Some(cause) = self.done() {
            return Err(ServiceError::Cancelled(cause));
        }

        let cancelled = async {
            match &self.cancel {
                Some(token) => token.cancelled().await,
                None => pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(ServiceError::Cancelled(CancelCause::Cancelled)),
            _ = expired => Err(ServiceError::Cancelled(CancelCause::DeadlineExpired)),
            output = fut => Ok(output),
        }
    }
}
