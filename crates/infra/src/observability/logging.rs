//! Global `tracing` subscriber setup
//!
//! `RUST_LOG`, when set and valid, takes precedence over the configured
//! level so operators can raise verbosity without touching config files.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::{InfraError, Result};

/// Install the global subscriber for `config`
///
/// # Errors
/// Returns `InfraError::Config` for an invalid level and
/// `InfraError::Logging` if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => config.env_filter()?,
    };
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if config.json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true).with_line_number(true)).try_init()
    };

    installed.map_err(|e| InfraError::Logging(e.to_string()))?;
    tracing::debug!(level = %config.level, json = config.json, "Logging initialized");
    Ok(())
}
