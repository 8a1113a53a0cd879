//! Retry policy with exponential backoff.
//!
//! Used when establishing connections to backing stores at startup, where a
//! store that is still booting should not fail the whole service.

use crate::PlatformError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Whether to add up to 25% random jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the delay cap.
    #[must_use]
    pub const fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Disable jitter (deterministic delays).
    #[must_use]
    pub const fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }
}

/// Executes fallible async operations with automatic retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy.
    #[must_use]
    pub const fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Delay to wait before retry number `attempt` (zero based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_ms =
            self.config.initial_delay.as_millis() as f64 * self.config.multiplier.powi(exponent);
        let capped_ms = base_ms.min(self.config.max_delay.as_millis() as f64);

        let final_ms = if self.config.jitter {
            capped_ms * (1.0 + rand::random::<f64>() * 0.25)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms as u64)
    }

    /// Whether `error` on retry number `attempt` should be retried.
    #[must_use]
    pub fn should_retry(&self, error: &PlatformError, attempt: u32) -> bool {
        attempt < self.config.max_retries && error.is_retryable()
    }

    /// Run `operation` until it succeeds, fails permanently or retries run out.
    ///
    /// # Errors
    ///
    /// Returns the last error when it is not retryable or retries are exhausted.
    pub async fn execute<F, Fut, T>(&self, name: &str, mut operation: F) -> Result<T, PlatformError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PlatformError>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if self.should_retry(&error, attempt) => {
                    let delay = self.delay_for_attempt(attempt);
                    debug!(operation = name, attempt, ?delay, %error, "retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.config.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
