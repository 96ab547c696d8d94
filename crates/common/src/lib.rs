//! Common utilities shared across DevTrack crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: errors and serde helpers
//! - `observability`: `tracing` instrumentation
//! - `runtime`: async resilience primitives (timeout, retry, circuit breaker)
//! - `test-utils`: scripted operations and the mock clock for downstream tests

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod error;
#[cfg(feature = "foundation")]
pub mod utils;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "runtime", feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "foundation")]
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
#[cfg(feature = "runtime")]
pub use resilience::{
    backoff_delay, with_retries, with_timeout, CircuitBreakerConfig, CircuitBreakerRegistry,
    CircuitBreakerState, CircuitState, Clock, ResilienceError, ResilienceResult, RetryOptions,
    SystemClock,
};
#[cfg(feature = "foundation")]
pub use utils::duration_millis;
