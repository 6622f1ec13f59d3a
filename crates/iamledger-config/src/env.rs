//! `IAMLEDGER_*` environment overrides.
//!
//! Environment variables are the highest-precedence layer: a set variable
//! replaces whatever the files say.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

/// Environment variable to dotted config path, and whether the value is an
/// integer.
const ENV_OVERRIDES: &[(&str, &str, bool)] = &[
    ("IAMLEDGER_STORAGE_BACKEND", "storage.backend", false),
    ("IAMLEDGER_STORAGE_PATH", "storage.path", false),
    ("IAMLEDGER_LOG_LEVEL", "logging.level", false),
    ("IAMLEDGER_LOG_FORMAT", "logging.format", false),
    ("IAMLEDGER_MAX_FETCH_SPAN", "access_log.max_fetch_span", true),
];

/// Snapshot the `IAMLEDGER_*` variables of this process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(k, _)| k.starts_with("IAMLEDGER_"))
        .collect()
}

/// Write every set override into `merged`. Returns how many applied.
///
/// # Errors
///
/// [`ConfigError::ValidationError`] if an integer variable does not parse.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied: usize = 0;
    for (var, path, integer) in ENV_OVERRIDES {
        let Some(raw) = env_vars.get(*var) else {
            continue;
        };
        let value = if *integer {
            let n: i64 = raw.parse().map_err(|_| ConfigError::ValidationError {
                field: (*var).to_owned(),
                message: format!("expected an integer, got '{raw}'"),
            })?;
            toml::Value::Integer(n)
        } else {
            toml::Value::String(raw.clone())
        };
        set_path(merged, path, value);
        debug!(var, path, "applied environment override");
        applied = applied.saturating_add(1);
    }
    Ok(applied)
}

fn set_path(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut node = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let toml::Value::Table(table) = node else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_owned(), value);
            return;
        }
        node = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}
