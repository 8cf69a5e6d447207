//! Attempt loop: admit, send under a fresh deadline, classify, back off.

use std::future::Future;

use tokio::time::{sleep, timeout_at, Instant};

use crate::{limiter::ConcurrencyLimiter, CallContext, Result, RetryPolicy, ServiceError};

/// Outcome of one network attempt.
enum Attempt<T> {
    Success(T),
    Transient(ServiceError),
    Permanent(ServiceError),
}

impl<T> From<Result<T>> for Attempt<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) if err.is_transient() => Self::Transient(err),
            Err(err) => Self::Permanent(err),
        }
    }
}

/// Runs `attempt` until it succeeds, fails permanently, or the policy's retry
/// budget is spent.
///
/// Each attempt holds a limiter slot only while it runs and gets its own
/// `request_timeout` deadline, capped by the caller's deadline. `attempt`
/// receives the zero-based attempt number.
pub(crate) async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    limiter: &ConcurrencyLimiter,
    ctx: &CallContext,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let request_timeout = policy.request_timeout();
    let mut n = 0u32;
    loop {
        let outcome = {
            let _slot = limiter.acquire(ctx).await?;
            let deadline = Instant::now() + request_timeout;
            match ctx.run(timeout_at(deadline, attempt(n))).await {
                Ok(Ok(result)) => Attempt::from(result),
                Ok(Err(_elapsed)) => Attempt::Transient(ServiceError::Timeout(request_timeout)),
                Err(cancelled) => Attempt::Permanent(cancelled),
            }
        };

        match outcome {
            Attempt::Success(value) => return Ok(value),
            Attempt::Permanent(err) => {
                tracing::debug!(attempt = n + 1, error = %err, "attempt failed permanently");
                return Err(err);
            }
            Attempt::Transient(err) if n < policy.max_retries => {
                tracing::debug!(
                    attempt = n + 1,
                    delay_ms = policy.retry_delay_ms,
                    error = %err,
                    "transient failure, retrying"
                );
                ctx.run(sleep(policy.retry_delay())).await?;
                n += 1;
            }
            Attempt::Transient(err) => {
                tracing::warn!(attempts = n + 1, error = %err, "retries exhausted");
                return Err(ServiceError::RetriesExhausted {
                    attempts: n + 1,
                    last: Box::new(err),
                });
            }
        }
    }
}
