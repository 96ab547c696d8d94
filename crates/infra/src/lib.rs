//! # DevTrack Infrastructure
//!
//! Process-level wiring for the resilience primitives in `devtrack-common`.
//!
//! This crate contains:
//! - Settings loading from TOML/JSON files and `DEVTRACK_*` environment
//!   variables
//! - `tracing-subscriber` initialization
//! - [`ResilienceService`], the shared handle call sites wrap their remote
//!   calls with
//!
//! ## Architecture
//! - Depends on `devtrack-common` for the primitives and error foundation
//! - Contains all "impure" code (files, environment, global subscriber)

pub mod config;
pub mod errors;
pub mod observability;
pub mod services;

// Re-export commonly used items
pub use config::{LoggingConfig, ResilienceSettings};
pub use errors::{InfraError, Result};
pub use observability::init_logging;
pub use services::ResilienceService;
