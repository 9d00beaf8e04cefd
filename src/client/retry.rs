//! Retry with exponential backoff
//!
//! The generic JSON path makes `maxRetries + 1` attempts when auto-retry is
//! enabled and exactly one otherwise. Waits happen only between attempts:
//! `base * 2^attempt`, no jitter, capped at [`MAX_BACKOFF`].

use crate::config::ApplicationSettings;
use crate::error::ClientResult;
use std::future::Future;
use std::time::Duration;

/// Delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Ceiling on a single backoff wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Attempt count and backoff schedule for one logical request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1
    pub attempts: u32,
    /// Wait after the first failed attempt
    pub base_delay: Duration,
    /// Upper bound on any single wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    /// Policy for the generic request path under `settings`.
    pub fn from_settings(settings: &ApplicationSettings) -> Self {
        Self {
            attempts: settings.attempt_count(),
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: MAX_BACKOFF,
        }
    }

    /// One attempt, no waiting.
    pub fn single_attempt() -> Self {
        Self {
            attempts: 1,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: MAX_BACKOFF,
        }
    }

    /// Replace the base delay, keeping the doubling schedule.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait inserted after the failed attempt at `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds or the attempts are exhausted
    ///
    /// The closure receives the 0-based attempt index. On exhaustion the
    /// error of the last attempt is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> ClientResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 >= attempts => return Err(err),
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    tracing::debug!(
                        attempt = attempt + 1,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
