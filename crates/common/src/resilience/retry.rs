//! Exponential backoff retrier
//!
//! Attempts an operation up to `max_retries + 1` times. Every attempt is
//! bounded by [`with_timeout`]; between failed attempts the loop sleeps
//! `min(base_delay * backoff_multiplier^attempt_index, max_delay)`.
//!
//! ```text
//! attempt 0 ──fail──▶ sleep 500ms ──▶ attempt 1 ──fail──▶ sleep 1000ms ──▶ ...
//!                                                     last attempt fails ──▶ last error
//! ```

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::error::{ResilienceError, ResilienceResult};
use super::timeout::{with_timeout, DEFAULT_TIMEOUT};
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Default number of retries after the initial attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default cap on any single backoff delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(5000);

/// Default growth factor between consecutive delays
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Options controlling one retry sequence
///
/// Durations are (de)serialized as integer milliseconds under `*_ms` keys;
/// absent keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Retries after the initial attempt (total attempts = `max_retries + 1`)
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(rename = "base_delay_ms", with = "duration_millis")]
    pub base_delay: Duration,
    /// Upper bound on any single delay
    #[serde(rename = "max_delay_ms", with = "duration_millis")]
    pub max_delay: Duration,
    /// Factor applied per attempt index
    pub backoff_multiplier: f64,
    /// Per-attempt timeout
    #[serde(rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RetryOptions {
    /// Create a builder starting from the defaults
    pub fn builder() -> RetryOptionsBuilder {
        RetryOptionsBuilder::new()
    }

    /// Total number of attempts, initial attempt included
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Validate the options
    pub fn validate(&self) -> CommonResult<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 0.0 {
            return Err(CommonError::config_field(
                "backoff_multiplier",
                "must be a finite number greater than 0",
            ));
        }

        if self.timeout.is_zero() {
            return Err(CommonError::config_field("timeout_ms", "must be greater than 0"));
        }

        Ok(())
    }
}

/// Builder for [`RetryOptions`] with fluent API
#[derive(Debug, Default)]
pub struct RetryOptionsBuilder {
    options: RetryOptions,
}

impl RetryOptionsBuilder {
    /// Start from [`RetryOptions::default`]
    pub fn new() -> Self {
        Self { options: RetryOptions::default() }
    }

    /// Set the number of retries after the initial attempt
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.options.max_retries = retries;
        self
    }

    /// Set the delay before the first retry
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.options.base_delay = delay;
        self
    }

    /// Set the cap on any single delay
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.options.max_delay = delay;
        self
    }

    /// Set the growth factor between delays
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.options.backoff_multiplier = multiplier;
        self
    }

    /// Set the per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Validate and return the options
    pub fn build(self) -> CommonResult<RetryOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Delay to wait after the failed attempt at `attempt_index` (zero-based)
///
/// Computed in microseconds so sub-millisecond base delays keep their
/// precision; the result never exceeds `max_delay`.
pub fn backoff_delay(options: &RetryOptions, attempt_index: u32) -> Duration {
    let exponent = i32::try_from(attempt_index).unwrap_or(i32::MAX);
    let delay = options.base_delay.as_micros() as f64 * options.backoff_multiplier.powi(exponent);
    let capped = delay.min(options.max_delay.as_micros() as f64);
    Duration::from_micros(capped as u64)
}

/// One failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Zero-based index of the failed attempt
    pub index: u32,
    /// Backoff before the next attempt
    pub delay: Duration,
    /// Why the attempt failed
    pub error: &'a ResilienceError<E>,
}

impl<E> RetryAttempt<'_, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// One-based attempt number, as shown in logs
    pub fn number(&self) -> u32 {
        self.index + 1
    }

    fn log(&self, total_attempts: u32) {
        warn!(
            attempt = self.number(),
            max_attempts = total_attempts,
            delay_ms = self.delay.as_millis() as u64,
            error = %self.error,
            "Attempt failed, retrying after backoff"
        );
    }
}

/// Run `operation` with per-attempt timeout and exponential backoff
///
/// Resolves with the first successful value. After the last attempt fails
/// the last observed error is returned: either the operation's own error as
/// [`ResilienceError::Operation`] or [`ResilienceError::Timeout`].
///
/// `options` must pass [`RetryOptions::validate`]. Its fields are public, so
/// options built without the builder are checked here in debug builds.
///
/// # Panics
/// In debug builds, if `options` fails validation.
#[instrument(skip_all, fields(max_retries = options.max_retries))]
pub async fn with_retries<F, Fut, T, E>(
    mut operation: F,
    options: &RetryOptions,
) -> ResilienceResult<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    #[cfg(debug_assertions)]
    {
        if let Err(err) = options.validate() {
            panic!("invalid retry options: {err}");
        }
    }

    let total_attempts = options.total_attempts();
    let mut last_error = None;

    for index in 0..total_attempts {
        match with_timeout(operation(), options.timeout).await {
            Ok(value) => {
                if index > 0 {
                    debug!(attempts = index + 1, "Operation succeeded after retries");
                }
                return Ok(value);
            }
            Err(error) => {
                if index + 1 < total_attempts {
                    let attempt =
                        RetryAttempt { index, delay: backoff_delay(options, index), error: &error };
                    attempt.log(total_attempts);
                    tokio::time::sleep(attempt.delay).await;
                }
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or(ResilienceError::RetriesExhausted { attempts: total_attempts }))
}
