//! Bounded retry with exponential backoff for code host calls.
//!
//! Only transient failures (including per-attempt timeouts) are retried;
//! permanent failures return after the first attempt.

use crate::review::ports::{CodeHostError, CodeHostResult};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retry bounds for outbound code host calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Three attempts, backing off from 500 ms and capped at 5 s.
    pub const DEFAULT: Self = Self {
        max_attempts: 3,
        initial_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(5),
    };

    /// Creates a policy; `max_attempts` is raised to at least one.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// Policy that retries without sleeping between attempts.
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Returns the total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the delay before the first retry.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    /// Returns the delay cap.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Returns the delay before retry number `retry` (0-indexed), doubling
    /// from the initial delay up to the cap.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(2_u32.saturating_pow(retry))
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of a retried call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// The call succeeded.
    Success(T),
    /// Every attempt failed transiently.
    Exhausted {
        /// Last error observed.
        last_error: CodeHostError,
        /// Attempts made.
        attempts: u32,
    },
    /// The call failed with an error that retrying will not fix.
    Permanent(CodeHostError),
}

impl<T> RetryOutcome<T> {
    /// Converts to a plain result, discarding the attempt count.
    ///
    /// # Errors
    ///
    /// Returns the last error when the call did not succeed.
    pub fn into_result(self) -> CodeHostResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Exhausted { last_error, .. } | Self::Permanent(last_error) => Err(last_error),
        }
    }
}

/// Runs `operation` under `policy`, bounding each attempt by `call_timeout`.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    call_timeout: Duration,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CodeHostResult<T>>,
{
    let mut attempt = 0_u32;
    loop {
        attempt = attempt.saturating_add(1);
        let result = tokio::time::timeout(call_timeout, operation())
            .await
            .unwrap_or(Err(CodeHostError::Timeout(call_timeout)));

        let error = match result {
            Ok(value) => return RetryOutcome::Success(value),
            Err(err) => err,
        };
        if !error.is_transient() {
            return RetryOutcome::Permanent(error);
        }
        if attempt >= policy.max_attempts {
            return RetryOutcome::Exhausted {
                last_error: error,
                attempts: attempt,
            };
        }

        let delay = policy.delay_for_retry(attempt.saturating_sub(1));
        debug!(attempt, ?delay, %error, "retrying code host call");
        tokio::time::sleep(delay).await;
    }
}
