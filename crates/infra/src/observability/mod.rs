//! Observability infrastructure
//!
//! The primitives in `devtrack-common` emit `tracing` events; this module
//! installs the process-wide subscriber that renders them.

pub mod logging;

pub use logging::init_logging;
