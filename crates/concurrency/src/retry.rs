//! Retry with exponential backoff
//!
//! An operation is attempted, and on failure retried after a delay that
//! doubles every time. The final attempt's outcome is returned as is.
//!
//! ```ignore
//! // Up to 3 retries after the first attempt, waiting 2s, 4s, 8s.
//! let data = retry(3, Duration::from_secs(2), || fetch(path)).await?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Run `operation`, retrying up to `max_retries` times on failure.
///
/// The first retry waits `initial_delay`, each further one twice as long as
/// the previous. A zero delay still yields to the scheduler and still counts
/// as an attempt. With `max_retries = n` an always-failing operation runs
/// `n + 1` times and the last error is returned.
pub async fn retry<T, E, F, Fut>(
    max_retries: usize,
    initial_delay: Duration,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut remaining = max_retries;
    let mut delay = initial_delay;

    while remaining > 0 {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(
                    target: "fireman::retry",
                    error = %e,
                    remaining,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt failed, backing off"
                );
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
                remaining -= 1;
                delay = delay.saturating_mul(2);
            }
        }
    }

    operation().await
}

/// Retry policy carried by client configuration
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new()
///     .with_max_retries(5)
///     .with_base_delay_ms(100);
/// let page = config.run(|| backend.get(path, &query)).await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (0 = no retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Delay before the first retry in milliseconds; doubles per retry
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RetryConfig with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first retry
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Delay slept before retry number `attempt` (0-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        // Cap the shift to prevent overflow (1 << 63 is the max for u64)
        let shift = attempt.min(63) as u32;
        Duration::from_millis(self.base_delay_ms.saturating_mul(1u64 << shift))
    }

    /// Run `operation` under this policy
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        retry(
            self.max_retries,
            Duration::from_millis(self.base_delay_ms),
            operation,
        )
        .await
    }
}
