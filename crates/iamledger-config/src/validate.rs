//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, StorageBackend};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Check a merged configuration. Stops at the first problem.
///
/// # Errors
///
/// [`ConfigError::ValidationError`] naming the offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.storage.backend == StorageBackend::Surrealkv {
        match config.storage.path.as_deref() {
            None => {
                return Err(ConfigError::invalid(
                    "storage.path",
                    "the surrealkv backend requires a data directory",
                ));
            },
            Some(path) if path.as_os_str().is_empty() => {
                return Err(ConfigError::invalid("storage.path", "path must not be empty"));
            },
            Some(_) => {},
        }
    }

    one_of("logging.level", &config.logging.level, LEVELS)?;
    one_of("logging.format", &config.logging.format, FORMATS)?;

    if config.access_log.max_fetch_span == Some(0) {
        return Err(ConfigError::invalid(
            "access_log.max_fetch_span",
            "must be at least 1; omit it for no limit",
        ));
    }
    Ok(())
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(
        field,
        format!("'{value}' is not one of {}", allowed.join(", ")),
    ))
}
