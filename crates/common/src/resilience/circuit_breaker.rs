//! Circuit breaker registry keyed by operation identifier
//!
//! Every identifier gets its own breaker entry, created lazily on first use
//! and kept until an explicit reset. A breaker opens once its consecutive
//! failure count reaches the configured threshold and rejects calls until the
//! cooldown has elapsed since the last failure. An expired open breaker is
//! closed directly on the next call; there is no half-open probe phase.
//!
//! ```text
//!            failure_count >= threshold
//!   CLOSED ─────────────────────────────▶ OPEN
//!     ▲                                    │
//!     └──── next call after cooldown ──────┘
//! ```
//!
//! Entries live in a [`DashMap`]; an entry's lock is only held for the
//! synchronous bookkeeping around a call, never while the operation runs.

use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::error::{ResilienceError, ResilienceResult};
use crate::error::{CommonError, CommonResult};
use crate::utils::serde::duration_millis;

/// Default number of consecutive failures that opens a circuit
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Default time an open circuit keeps rejecting calls
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(30_000);

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// Configuration shared by every breaker in a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening the circuit
    pub failure_threshold: u32,
    /// Time since the last failure after which an open circuit closes
    #[serde(rename = "cooldown_ms", with = "duration_millis")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: DEFAULT_FAILURE_THRESHOLD, cooldown: DEFAULT_COOLDOWN }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.failure_threshold == 0 {
            return Err(CommonError::config_field(
                "failure_threshold",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`] with fluent API
#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    /// Start from [`CircuitBreakerConfig::default`]
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    /// Set the failures that open a circuit
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Set how long an open circuit rejects calls
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.config.cooldown = cooldown;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> CommonResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Point-in-time snapshot of one identifier's breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerState {
    /// Consecutive failures since the last success or reset
    pub failure_count: u32,
    /// Wall-clock time of the most recent failure, in ms since the UNIX epoch
    pub last_failure_epoch_ms: Option<u64>,
    /// Whether calls are currently being rejected
    pub is_open: bool,
}

impl CircuitBreakerState {
    /// `Open` or `Closed`, derived from `is_open`
    pub fn state(&self) -> CircuitState {
        if self.is_open {
            CircuitState::Open
        } else {
            CircuitState::Closed
        }
    }
}

#[derive(Debug, Default)]
struct Circuit {
    failure_count: u32,
    last_failure: Option<Instant>,
    last_failure_epoch_ms: Option<u64>,
    is_open: bool,
}

impl Circuit {
    fn snapshot(&self) -> CircuitBreakerState {
        CircuitBreakerState {
            failure_count: self.failure_count,
            last_failure_epoch_ms: self.last_failure_epoch_ms,
            is_open: self.is_open,
        }
    }
}

/// Per-identifier circuit breakers sharing one configuration
///
/// Cheap to share behind an `Arc`; all methods take `&self`. Generic over
/// [`Clock`] so tests can expire cooldowns with a `MockClock`.
pub struct CircuitBreakerRegistry<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    circuits: DashMap<String, Circuit>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreakerRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("config", &self.config)
            .field("tracked", &self.circuits.len())
            .finish()
    }
}

impl CircuitBreakerRegistry<SystemClock> {
    /// Create a registry with the given configuration using the system clock
    pub fn new(config: CircuitBreakerConfig) -> CommonResult<Self> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a registry with the default configuration
    pub fn with_defaults() -> Self {
        Self::default()
    }
}

impl Default for CircuitBreakerRegistry<SystemClock> {
    fn default() -> Self {
        Self::from_parts(CircuitBreakerConfig::default(), SystemClock)
    }
}

impl<C: Clock> CircuitBreakerRegistry<C> {
    /// Create a registry with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, clock))
    }

    fn from_parts(config: CircuitBreakerConfig, clock: C) -> Self {
        Self { config, circuits: DashMap::new(), clock }
    }

    /// Configuration shared by every breaker
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Run `operation` under the breaker for `operation_id`
    ///
    /// Fails with [`ResilienceError::CircuitOpen`] without invoking the
    /// operation while the breaker is open and its cooldown has not elapsed.
    /// Otherwise the operation's outcome updates the breaker and is returned,
    /// its own error wrapped in [`ResilienceError::Operation`].
    #[instrument(skip(self, operation))]
    pub async fn with_circuit_breaker<F, Fut, T, E>(
        &self,
        operation_id: &str,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.guarded(operation_id, || async move {
            operation().await.map_err(ResilienceError::Operation)
        })
        .await
    }

    /// Admission, invocation and bookkeeping shared by every breaker entry
    /// point. Any error from `operation` counts as one failure.
    pub(crate) async fn guarded<F, Fut, T, E>(
        &self,
        operation_id: &str,
        operation: F,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResilienceResult<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if let Err(retry_after) = self.admit(operation_id) {
            debug!(
                operation_id,
                retry_after_ms = retry_after.as_millis() as u64,
                "Circuit breaker rejecting call"
            );
            return Err(ResilienceError::CircuitOpen {
                operation_id: operation_id.to_string(),
                retry_after: Some(retry_after),
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success(operation_id);
                Ok(value)
            }
            Err(error) => {
                self.record_failure(operation_id);
                Err(error)
            }
        }
    }

    /// Decide whether a call may proceed, closing an expired open circuit.
    /// Returns the remaining cooldown when the call must be rejected.
    fn admit(&self, operation_id: &str) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut circuit = self.circuits.entry(operation_id.to_string()).or_default();

        if !circuit.is_open {
            return Ok(());
        }

        let since_failure = circuit
            .last_failure
            .map_or(self.config.cooldown, |at| now.saturating_duration_since(at));

        if since_failure >= self.config.cooldown {
            circuit.is_open = false;
            circuit.failure_count = 0;
            info!(operation_id, "Circuit breaker cooldown elapsed, closing circuit");
            Ok(())
        } else {
            Err(self.config.cooldown - since_failure)
        }
    }

    fn record_success(&self, operation_id: &str) {
        if let Some(mut circuit) = self.circuits.get_mut(operation_id) {
            // A straggler finishing after the circuit opened leaves it open.
            if !circuit.is_open && circuit.failure_count != 0 {
                circuit.failure_count = 0;
            }
        }
    }

    fn record_failure(&self, operation_id: &str) {
        let now = self.clock.now();
        let epoch_ms = self.clock.millis_since_epoch();
        let mut circuit = self.circuits.entry(operation_id.to_string()).or_default();

        circuit.failure_count = circuit.failure_count.saturating_add(1);
        circuit.last_failure = Some(now);
        circuit.last_failure_epoch_ms = Some(epoch_ms);

        if !circuit.is_open && circuit.failure_count >= self.config.failure_threshold {
            circuit.is_open = true;
            warn!(
                operation_id,
                failures = circuit.failure_count,
                cooldown_ms = self.config.cooldown.as_millis() as u64,
                "Circuit breaker opened"
            );
        }
    }

    /// Forget everything about `operation_id`; returns whether it was tracked
    pub fn reset_circuit_breaker(&self, operation_id: &str) -> bool {
        let removed = self.circuits.remove(operation_id).is_some();
        if removed {
            info!(operation_id, "Circuit breaker reset");
        }
        removed
    }

    /// Snapshot of the breaker for `operation_id`, `None` if never used or
    /// reset since
    pub fn circuit_breaker_status(&self, operation_id: &str) -> Option<CircuitBreakerState> {
        self.circuits.get(operation_id).map(|circuit| circuit.snapshot())
    }

    /// Identifiers with a breaker entry, sorted
    pub fn tracked_operations(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.circuits.iter().map(|entry| entry.key().clone()).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of tracked identifiers
    pub fn len(&self) -> usize {
        self.circuits.len()
    }

    /// Whether no identifier is tracked
    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
    }
}
