//! Resilience patterns for flaky network and storage calls
//!
//! This module provides the building blocks DevTrack wraps around every
//! remote call:
//! - **Timeout**: bounds a single attempt ([`with_timeout`])
//! - **Retry Logic**: exponential backoff with a delay cap ([`with_retries`])
//! - **Circuit Breaker**: per-operation breakers that stop calling a failing
//!   dependency for a cooldown ([`CircuitBreakerRegistry`])
//!
//! The registry composes the two:
//!
//! ```rust,ignore
//! let registry = CircuitBreakerRegistry::with_defaults();
//! let projects = registry
//!     .with_retries_and_circuit_breaker("load-projects", || fetch_projects(), &RetryOptions::default())
//!     .await?;
//! ```
//!
//! All primitives are generic over the operation's error type and report
//! failures as [`ResilienceError`]. Cooldowns are measured against a
//! [`Clock`] so tests can substitute [`MockClock`].

pub mod circuit_breaker;
pub mod clock;
pub mod composite;
pub mod error;
pub mod retry;
pub mod timeout;

pub use circuit_breaker::{
    CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerRegistry, CircuitBreakerState,
    CircuitState, DEFAULT_COOLDOWN, DEFAULT_FAILURE_THRESHOLD,
};
pub use clock::{Clock, MockClock, SystemClock};
pub use error::{ResilienceError, ResilienceResult};
pub use retry::{
    backoff_delay, with_retries, RetryAttempt, RetryOptions, RetryOptionsBuilder,
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES,
};
pub use timeout::{with_timeout, DEFAULT_TIMEOUT};
