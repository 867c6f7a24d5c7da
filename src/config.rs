//! Runtime configuration for the decision and merge workflow.
//!
//! Every setting has a default; environment variables override them:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `REVIEW_GATE_POLL_INTERVAL_SECS` | reconciliation sweep period | 30 |
//! | `REVIEW_GATE_CALL_TIMEOUT_MS` | bound on each code host call | 5000 |
//! | `REVIEW_GATE_MERGE_ATTEMPTS` | attempts per code host call | 3 |
//! | `REVIEW_GATE_MERGE_BACKOFF_MS` | first retry delay | 500 |
//! | `REVIEW_GATE_MERGE_BACKOFF_MAX_MS` | retry delay cap | 5000 |
//! | `REVIEW_GATE_MERGE_METHOD` | `merge`, `squash` or `rebase` | `merge` |

use crate::review::ports::MergeMethod;
use crate::review::services::RetryPolicy;
use std::time::Duration;
use thiserror::Error;

/// Environment variable for the reconciliation sweep period in seconds.
pub const POLL_INTERVAL_ENV: &str = "REVIEW_GATE_POLL_INTERVAL_SECS";
/// Environment variable for the per-call timeout in milliseconds.
pub const CALL_TIMEOUT_ENV: &str = "REVIEW_GATE_CALL_TIMEOUT_MS";
/// Environment variable for attempts per code host call.
pub const MERGE_ATTEMPTS_ENV: &str = "REVIEW_GATE_MERGE_ATTEMPTS";
/// Environment variable for the first retry delay in milliseconds.
pub const MERGE_BACKOFF_ENV: &str = "REVIEW_GATE_MERGE_BACKOFF_MS";
/// Environment variable for the retry delay cap in milliseconds.
pub const MERGE_BACKOFF_MAX_ENV: &str = "REVIEW_GATE_MERGE_BACKOFF_MAX_MS";
/// Environment variable for the merge method.
pub const MERGE_METHOD_ENV: &str = "REVIEW_GATE_MERGE_METHOD";

/// Errors returned while reading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The value could not be parsed.
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
        /// Parse failure.
        reason: String,
    },

    /// The value must be positive.
    #[error("{key} must be greater than zero")]
    Zero {
        /// Variable name.
        key: &'static str,
    },
}

/// Timing and merge settings shared by the workflow services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Period between reconciliation sweeps.
    pub poll_interval: Duration,
    /// Upper bound on a single code host call.
    pub call_timeout: Duration,
    /// Retry bounds for comment posts and merge requests.
    pub retry: RetryPolicy,
    /// Merge method passed to the code host.
    pub merge_method: MergeMethod,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            call_timeout: Duration::from_secs(5),
            retry: RetryPolicy::DEFAULT,
            merge_method: MergeMethod::Merge,
        }
    }
}

impl WorkflowConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a set variable is malformed or zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// unset or blank keys.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is malformed or zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let read = |key: &'static str| lookup(key).filter(|value| !value.trim().is_empty());

        let poll_interval = positive(POLL_INTERVAL_ENV, read(POLL_INTERVAL_ENV))?
            .map_or(defaults.poll_interval, Duration::from_secs);
        let call_timeout = positive(CALL_TIMEOUT_ENV, read(CALL_TIMEOUT_ENV))?
            .map_or(defaults.call_timeout, Duration::from_millis);

        let attempts = positive(MERGE_ATTEMPTS_ENV, read(MERGE_ATTEMPTS_ENV))?
            .map(|value| {
                u32::try_from(value).map_err(|err| ConfigError::Invalid {
                    key: MERGE_ATTEMPTS_ENV,
                    value: value.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()?
            .unwrap_or_else(|| defaults.retry.max_attempts());
        let initial_delay = non_negative(MERGE_BACKOFF_ENV, read(MERGE_BACKOFF_ENV))?
            .map_or(defaults.retry.initial_delay(), Duration::from_millis);
        let max_delay = non_negative(MERGE_BACKOFF_MAX_ENV, read(MERGE_BACKOFF_MAX_ENV))?
            .map_or(defaults.retry.max_delay(), Duration::from_millis);

        let merge_method = read(MERGE_METHOD_ENV)
            .map(|value| {
                value.parse::<MergeMethod>().map_err(|err| ConfigError::Invalid {
                    key: MERGE_METHOD_ENV,
                    value: value.clone(),
                    reason: err.to_string(),
                })
            })
            .transpose()?
            .unwrap_or(defaults.merge_method);

        Ok(Self {
            poll_interval,
            call_timeout,
            retry: RetryPolicy::new(attempts, initial_delay, max_delay),
            merge_method,
        })
    }
}

fn non_negative(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u64>()
            .map_err(|err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: err.to_string(),
            })
    })
    .transpose()
}

fn positive(key: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    match non_negative(key, raw)? {
        Some(0) => Err(ConfigError::Zero { key }),
        parsed => Ok(parsed),
    }
}
