//! Exponential backoff retry policy for directory API calls.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{DirectoryError, DirectoryResult};

/// Retry policy: a bounded number of attempts with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts (first try included).
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given attempt budget and base delay.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Self::default()
        }
    }

    /// Whether the error is worth another attempt.
    #[must_use]
    pub fn is_transient(error: &DirectoryError) -> bool {
        error.is_retryable() || error.is_server_error()
    }

    /// Backoff before the given attempt: zero for the first attempt,
    /// `base * 2^attempt` afterwards, capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponential = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        exponential.min(self.max_delay)
    }

    /// Delay before the given attempt, honoring a `Retry-After` hint when
    /// the previous error carried one.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &DirectoryError) -> Duration {
        if let DirectoryError::RateLimited {
            retry_after_secs: Some(secs),
        } = error
        {
            return Duration::from_secs(*secs).min(self.max_delay);
        }
        self.backoff(attempt)
    }

    /// Run an async operation under this policy.
    ///
    /// `f` is re-invoked after each transient failure until it succeeds, a
    /// non-retryable error occurs, or the attempt budget is exhausted.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> DirectoryResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = DirectoryResult<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(operation, attempts = attempt + 1, "succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let next = attempt + 1;
                    if !Self::is_transient(&error) {
                        return Err(error);
                    }
                    if next >= self.max_attempts {
                        warn!(operation, attempts = next, error = %error, "retry budget exhausted");
                        return Err(DirectoryError::MaxRetriesExceeded {
                            attempts: next,
                            message: format!("{operation} failed after {next} attempt(s): {error}"),
                        });
                    }
                    let delay = self.delay_for(next, &error);
                    debug!(
                        operation,
                        attempt = next,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
            }
        }
    }
}
