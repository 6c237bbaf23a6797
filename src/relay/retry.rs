//! Retry with exponential backoff for idempotent ledger reads
//!
//! Only transient failures (rate limiting, timeouts, connection resets) are
//! retried. The schedule comes from [`Backoff`] with factor 2 and jitter
//! disabled, so each delay doubles the previous one. After the last attempt
//! the last error is returned unchanged.

use std::future::Future;
use std::time::Duration;

use exponential_backoff::Backoff;
use tokio::time::sleep;
use tracing::warn;

use crate::ledger::RpcError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; 0 is treated as 1
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn backoff(&self) -> Backoff {
        let mut backoff = Backoff::new(self.max_attempts, self.base_delay, None);
        backoff.set_factor(2);
        backoff.set_jitter(0.0);
        backoff
    }

    /// Delays slept between attempts, in order
    pub fn schedule(&self) -> Vec<Duration> {
        self.backoff().into_iter().flatten().collect()
    }

    /// Run `op` until it succeeds, fails non-transiently, or attempts run out
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut backoff = self.backoff().into_iter();
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            match backoff.next() {
                Some(Some(delay)) => {
                    warn!(
                        op = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        code = err.code(),
                        "transient RPC failure, retrying: {}",
                        err
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                _ => return Err(err),
            }
        }
    }
}
