//! Admission gate bounding in-flight attempts.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{CallContext, Result, ServiceError};

/// Counting gate with a fixed number of slots.
///
/// Waiters are served roughly in arrival order; only the slot count is a
/// guarantee.
#[derive(Debug)]
pub(crate) struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
}

impl ConcurrencyLimiter {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Waits for a free slot, giving up when `ctx` is done or the gate is closed.
    pub(crate) async fn acquire(&self, ctx: &CallContext) -> Result<Slot> {
        let permit = ctx
            .run(self.semaphore.clone().acquire_owned())
            .await?
            .map_err(|_| ServiceError::Closed)?;
        Ok(Slot { _permit: permit })
    }

    /// Fails current and future waiters with [`ServiceError::Closed`].
    /// Slots already handed out stay valid until dropped.
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }

    pub(crate) fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// One admitted attempt. The slot is returned when this is dropped,
/// including on early return, cancellation or panic.
#[derive(Debug)]
pub(crate) struct Slot {
    _permit: OwnedSemaphorePermit,
}
