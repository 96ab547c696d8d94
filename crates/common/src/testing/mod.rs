//! Testing utilities and helpers
//!
//! - **[`mocks`]**: scripted flaky operations
//! - [`MockClock`] re-exported from the resilience clock so tests can expire
//!   breaker cooldowns without sleeping
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use devtrack_common::resilience::{CircuitBreakerConfig, CircuitBreakerRegistry};
//! use devtrack_common::testing::MockClock;
//!
//! let clock = MockClock::new();
//! let registry = CircuitBreakerRegistry::with_clock(CircuitBreakerConfig::default(), clock.clone())
//!     .expect("default config is valid");
//! clock.advance(Duration::from_secs(30));
//! assert!(registry.is_empty());
//! ```

pub mod mocks;

pub use mocks::{FlakyOperation, MockFailure};

pub use crate::resilience::clock::{Clock, MockClock, SystemClock};
