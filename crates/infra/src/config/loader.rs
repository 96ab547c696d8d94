//! Configuration loader
//!
//! Loads [`ResilienceSettings`] from a config file and environment variables.
//!
//! ## Loading Strategy
//! 1. Probes multiple paths for a config file (JSON or TOML)
//! 2. Falls back to defaults when no file exists
//! 3. Applies environment variable overrides
//! 4. Validates the result
//!
//! ## Environment Variables
//! - `DEVTRACK_RETRY_MAX_RETRIES`: Retries after the initial attempt
//! - `DEVTRACK_RETRY_BASE_DELAY_MS`: Delay before the first retry
//! - `DEVTRACK_RETRY_MAX_DELAY_MS`: Cap on any single delay
//! - `DEVTRACK_RETRY_BACKOFF_MULTIPLIER`: Growth factor between delays
//! - `DEVTRACK_RETRY_TIMEOUT_MS`: Per-attempt timeout
//! - `DEVTRACK_CIRCUIT_FAILURE_THRESHOLD`: Failures that open a circuit
//! - `DEVTRACK_CIRCUIT_COOLDOWN_MS`: Time an open circuit rejects calls
//! - `DEVTRACK_LOG_LEVEL`: Filter directives (`RUST_LOG` syntax)
//! - `DEVTRACK_LOG_JSON`: JSON log lines (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./devtrack.toml`, `./devtrack.json`, `./config.toml`, `./config.json`
//! 2. The same names in the parent directory
//! 3. The same names in the grandparent directory
//! 4. The same names next to the executable

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use devtrack_common::error::CommonError;
use tracing::{debug, info, warn};

use super::ResilienceSettings;
use crate::errors::{InfraError, Result};

const CONFIG_FILE_NAMES: [&str; 4] = ["devtrack.toml", "devtrack.json", "config.toml", "config.json"];

/// Load settings with automatic fallback strategy
///
/// # Errors
/// Returns `InfraError::Config` if a found file cannot be read or an override
/// is unparseable, and `InfraError::Common` if the file fails to parse.
/// Validation failures surface as `InfraError::Common` or `InfraError::Config`.
pub fn load() -> Result<ResilienceSettings> {
    let settings = match probe_config_paths() {
        Some(path) => load_from_file(&path)?,
        None => {
            debug!("No config file found in standard locations, using defaults");
            ResilienceSettings::default()
        }
    };

    let settings = apply_env_overrides(settings)?;
    settings.validate()?;

    info!(
        max_retries = settings.retry.max_retries,
        failure_threshold = settings.circuit_breaker.failure_threshold,
        cooldown_ms = settings.circuit_breaker.cooldown.as_millis() as u64,
        "Resilience settings loaded"
    );
    Ok(settings)
}

/// Load settings from a file
///
/// Format is detected by file extension (`.json` or `.toml`). Absent keys
/// take their defaults. The result is not validated; [`load`] validates
/// after environment overrides are applied.
///
/// # Errors
/// Returns `InfraError::Config` if the file does not exist, cannot be read or
/// has an unsupported extension. Parse failures surface as
/// `InfraError::Common` wrapping `CommonError::Serialization`.
pub fn load_from_file(path: &Path) -> Result<ResilienceSettings> {
    if !path.exists() {
        return Err(InfraError::Config(format!("Config file not found: {}", path.display())));
    }

    info!(path = %path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(path)
        .map_err(|e| InfraError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, path)
}

/// Parse settings from string content, format chosen by extension
fn parse_config(contents: &str, path: &Path) -> Result<ResilienceSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    let parsed = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CommonError::serialization_format("toml", e.to_string())),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CommonError::serialization_format("json", e.to_string())),
        _ => {
            return Err(InfraError::Config(format!("Unsupported config format: {}", extension)))
        }
    };

    parsed.map_err(|err| {
        warn!(
            path = %path.display(),
            error_type = err.error_type_name(),
            error = %err,
            "Failed to parse config file"
        );
        InfraError::from(err)
    })
}

/// Probe the standard locations for a config file
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.extend(cwd.ancestors().skip(1).take(2).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    probe_dirs(&dirs)
}

fn probe_dirs(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Apply `DEVTRACK_*` environment overrides on top of `settings`
///
/// Unset variables leave the corresponding field unchanged.
///
/// # Errors
/// Returns `InfraError::Config` naming the variable if a value cannot be
/// parsed.
pub fn apply_env_overrides(mut settings: ResilienceSettings) -> Result<ResilienceSettings> {
    if let Some(retries) = env_parse::<u32>("DEVTRACK_RETRY_MAX_RETRIES")? {
        settings.retry.max_retries = retries;
    }
    if let Some(delay) = env_millis("DEVTRACK_RETRY_BASE_DELAY_MS")? {
        settings.retry.base_delay = delay;
    }
    if let Some(delay) = env_millis("DEVTRACK_RETRY_MAX_DELAY_MS")? {
        settings.retry.max_delay = delay;
    }
    if let Some(multiplier) = env_parse::<f64>("DEVTRACK_RETRY_BACKOFF_MULTIPLIER")? {
        settings.retry.backoff_multiplier = multiplier;
    }
    if let Some(timeout) = env_millis("DEVTRACK_RETRY_TIMEOUT_MS")? {
        settings.retry.timeout = timeout;
    }
    if let Some(threshold) = env_parse::<u32>("DEVTRACK_CIRCUIT_FAILURE_THRESHOLD")? {
        settings.circuit_breaker.failure_threshold = threshold;
    }
    if let Some(cooldown) = env_millis("DEVTRACK_CIRCUIT_COOLDOWN_MS")? {
        settings.circuit_breaker.cooldown = cooldown;
    }
    if let Some(level) = env_var("DEVTRACK_LOG_LEVEL") {
        settings.logging.level = level;
    }
    if let Some(json) = env_bool("DEVTRACK_LOG_JSON")? {
        settings.logging.json = json;
    }

    Ok(settings)
}

/// Get an environment variable, treating unset and blank the same
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env_var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| InfraError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}

fn env_millis(key: &str) -> Result<Option<Duration>> {
    Ok(env_parse::<u64>(key)?.map(Duration::from_millis))
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str) -> Result<Option<bool>> {
    env_var(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(InfraError::Config(format!("Invalid boolean for {}: {}", key, other))),
        })
        .transpose()
}
