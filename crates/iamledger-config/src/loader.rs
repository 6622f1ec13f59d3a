//! Layered loading.
//!
//! Layers, lowest precedence first:
//! 1. Embedded `defaults.toml`
//! 2. `/etc/iamledger/config.toml` (system)
//! 3. `~/.iamledger/config.toml` (user)
//! 4. An explicit file passed by the caller
//! 5. `IAMLEDGER_*` environment variables
//!
//! Tables merge key by key; scalars and arrays from a higher layer replace
//! the lower one. The merged tree is deserialized into [`Config`] and
//! validated once, at the end.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;
use crate::validate;

const DEFAULTS: &str = include_str!("defaults.toml");
const DEFAULTS_LABEL: &str = "<embedded defaults>";
const SYSTEM_CONFIG: &str = "/etc/iamledger/config.toml";
const USER_CONFIG_DIR: &str = ".iamledger";
const CONFIG_FILE: &str = "config.toml";

/// Files larger than this are refused before parsing.
const FILE_LIMIT: u64 = 1024 * 1024;

/// A validated configuration and the files it was built from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Effective configuration.
    pub config: Config,
    /// Contributing files, lowest precedence first.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// The effective configuration as TOML, for `config show`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::SerializeError`] if rendering fails.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(&self.config)?)
    }
}

/// Accumulates layers over the embedded defaults.
struct Layers {
    tree: toml::Value,
    files: Vec<String>,
}

impl Layers {
    fn defaults() -> ConfigResult<Self> {
        Ok(Self {
            tree: toml::from_str(DEFAULTS).map_err(|e| ConfigError::parse(DEFAULTS_LABEL, e))?,
            files: Vec::new(),
        })
    }

    /// Merge `path` if it exists. A missing `required` file is an error.
    fn file(&mut self, path: &Path, required: bool) -> ConfigResult<()> {
        match read_layer(path)? {
            Some(layer) => {
                overlay(&mut self.tree, &layer);
                self.files.push(path.display().to_string());
                info!(path = %path.display(), "loaded config layer");
            },
            None if required => {
                return Err(ConfigError::read(
                    path,
                    std::io::Error::from(std::io::ErrorKind::NotFound),
                ));
            },
            None => debug!(path = %path.display(), "no config layer here"),
        }
        Ok(())
    }

    fn env(&mut self, vars: &HashMap<String, String>) -> ConfigResult<()> {
        let applied = apply_env_overrides(&mut self.tree, vars)?;
        if applied > 0 {
            debug!(applied, "applied environment overrides");
        }
        Ok(())
    }

    fn finish(self, label: &str) -> ConfigResult<(Config, Vec<String>)> {
        let config = self
            .tree
            .try_into::<Config>()
            .map_err(|e| ConfigError::parse(label, e))?;
        validate::validate(&config)?;
        Ok((config, self.files))
    }
}

/// Load through every layer.
///
/// `home_override` stands in for the user's home directory when locating
/// `~/.iamledger/config.toml`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is malformed, the explicit file is
/// missing, or the merged configuration fails validation.
pub fn load(explicit: Option<&Path>, home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, home_override, &collect_env_vars())
}

pub(crate) fn load_with_env(
    explicit: Option<&Path>,
    home_override: Option<&Path>,
    vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut layers = Layers::defaults()?;
    layers.file(Path::new(SYSTEM_CONFIG), false)?;

    let home = home_override.map(Path::to_path_buf).or_else(home_directory);
    match home {
        Some(home) => {
            layers.file(&home.join(USER_CONFIG_DIR).join(CONFIG_FILE), false)?;
        },
        None => debug!("no home directory; skipping user layer"),
    }

    if let Some(path) = explicit {
        layers.file(path, true)?;
    }
    layers.env(vars)?;

    let (config, loaded_files) = layers.finish("<merged config>")?;
    Ok(ResolvedConfig {
        config,
        loaded_files,
    })
}

/// One file over the embedded defaults, ignoring the system, user and
/// environment layers.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, malformed,
/// or invalid.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let mut layers = Layers::defaults()?;
    layers.file(path, true)?;
    let (config, _) = layers.finish(&path.display().to_string())?;
    Ok(config)
}

fn overlay(base: &mut toml::Value, layer: &toml::Value) {
    let (toml::Value::Table(base), toml::Value::Table(layer)) = (&mut *base, layer) else {
        *base = layer.clone();
        return;
    };
    for (key, value) in layer {
        match base.get_mut(key) {
            Some(existing) => overlay(existing, value),
            None => {
                base.insert(key.clone(), value.clone());
            },
        }
    }
}

/// Parse a layer file. `Ok(None)` if it does not exist.
///
/// The read is capped at one byte past the limit, so an oversized file is
/// never pulled fully into memory.
fn read_layer(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::read(path, e)),
    };

    let mut bytes = Vec::new();
    file.take(FILE_LIMIT.saturating_add(1))
        .read_to_end(&mut bytes)
        .map_err(|e| ConfigError::read(path, e))?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > FILE_LIMIT {
        return Err(ConfigError::invalid(
            &path.display().to_string(),
            format!("config files are limited to {FILE_LIMIT} bytes"),
        ));
    }
    let content = String::from_utf8(bytes).map_err(|e| {
        ConfigError::read(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        )
    })?;

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::parse(&path.display().to_string(), e))
}

fn home_directory() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}
