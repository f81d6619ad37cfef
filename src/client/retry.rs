//! Retry Policy for Read Operations
//!
//! Transient network failures on read-only gateway calls are retried with
//! exponential backoff and jitter. Sends are never routed through this
//! policy: a failed send becomes a `Failed` delivery marker that the user
//! resends explicitly, so an automatic retry could duplicate the message.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::shared::error::NetworkError;

/// Exponential backoff policy for retryable gateway reads
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            jitter: 0.1,
        }
    }

    /// Override the jitter fraction (0.0 disables jitter)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the attempt following `attempt` (1-based).
    ///
    /// Doubles per attempt from the base delay, capped at the maximum, with a
    /// random jitter fraction added on top.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let capped = exponential.min(self.max_delay);

        let jitter_ms = (capped.as_millis() as f64 * self.jitter) as u64;
        if jitter_ms == 0 {
            return capped;
        }
        capped + Duration::from_millis(rand::random::<u64>() % jitter_ms)
    }

    /// Run `operation`, retrying on transient failures until the attempt
    /// budget is exhausted. Non-retryable errors are returned immediately.
    pub async fn run<T, Fut, Op>(&self, mut operation: Op) -> Result<T, NetworkError>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NetworkError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
