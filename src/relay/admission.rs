//! Admission gate bounding concurrent transfers
//!
//! Wraps a fair (FIFO) [`Semaphore`]: at most `capacity` requests hold an
//! [`AdmissionSlot`] at once, later arrivals queue in arrival order. The slot
//! is an owned permit released on drop, so every exit path of a request
//! (success, error, panic, cancellation) gives it back exactly once.
//!
//! Waiting is bounded by `wait_timeout`; a waiter that times out leaves the
//! queue without ever holding a slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::warn;

use super::error::RelayError;

pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    wait_timeout: Option<Duration>,
}

/// One of the gate's concurrent execution rights
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// `capacity` of 0 is raised to 1. `wait_timeout` of `None` waits forever.
    pub fn new(capacity: usize, wait_timeout: Option<Duration>) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            wait_timeout,
        }
    }

    pub async fn acquire(&self) -> Result<AdmissionSlot, RelayError> {
        let acquire = self.semaphore.clone().acquire_owned();
        let permit = match self.wait_timeout {
            Some(limit) => match timeout(limit, acquire).await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(
                        capacity = self.capacity,
                        wait_ms = limit.as_millis() as u64,
                        "admission wait timed out"
                    );
                    return Err(RelayError::Overloaded);
                }
            },
            None => acquire.await,
        };
        // The semaphore is never closed
        let permit = permit.map_err(|_| RelayError::Overloaded)?;
        Ok(AdmissionSlot { _permit: permit })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently held
    pub fn in_flight(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }
}
