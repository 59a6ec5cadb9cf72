//! Exponential backoff retry for forge API calls.
//!
//! Only our own observations are retried: status listings, comment listings,
//! file reads. Trigger-firing calls (comments, commits, PR creation) run with
//! `RetryPolicy::NoRetry` so the harness never provokes the service twice -
//! any retry of the service's own actions belongs to the service, not here.

use std::future::Future;
use std::time::Duration;

use super::error::{ForgeError, ForgeErrorKind};

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    pub initial_delay: Duration,

    /// Maximum delay between retries (cap for exponential growth).
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (typically 2.0).
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Default retry configuration: 3 retries with 2s, 4s, 8s delays.
    ///
    /// Short enough that a retried read inside a polling loop stays well
    /// under the loop's watch window.
    pub const DEFAULT: Self = Self {
        max_retries: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(16),
        backoff_multiplier: 2.0,
    };

    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff_multiplier,
        }
    }

    /// Computes the delay for the given retry attempt (0-indexed).
    ///
    /// The delay grows exponentially: `initial_delay * backoff_multiplier^attempt`,
    /// capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let multiplier = self.backoff_multiplier.powi(attempt as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * multiplier;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Retry policy for controlling retry behavior at runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry transient errors with exponential backoff.
    #[default]
    RetryTransient,

    /// Do not retry - return errors immediately. Used for trigger-firing
    /// calls that must not run twice.
    NoRetry,
}

/// Executes an async operation, retrying transient errors with backoff.
///
/// Permanent errors are returned immediately. After exhausting retries the
/// last transient error is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    config: RetryConfig,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ForgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ForgeError>>,
{
    let max_attempts = if policy == RetryPolicy::NoRetry {
        1
    } else {
        config.max_retries + 1 // Include initial attempt
    };
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;

                match e.kind {
                    ForgeErrorKind::Permanent => return Err(e),
                    ForgeErrorKind::Transient => {
                        if attempt >= max_attempts {
                            return Err(e);
                        }

                        let delay = config.delay_for_attempt(attempt - 1);
                        tracing::debug!(
                            attempt,
                            delay_secs = delay.as_secs_f64(),
                            error = %e,
                            "retrying transient forge error"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }
}
