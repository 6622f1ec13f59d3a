#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! TOML configuration for the iamledger CLI.
//!
//! ```rust,no_run
//! use iamledger_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("storage backend: {}", resolved.config.storage.backend);
//! ```
//!
//! Later layers win: embedded defaults, `/etc/iamledger/config.toml`,
//! `~/.iamledger/config.toml`, the `--config` file, then `IAMLEDGER_*`
//! variables.
//!
//! No other iamledger crate is a dependency. Consumers convert sections into
//! their own types.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::{AccessLogSection, Config, LoggingSection, StorageBackend, StorageSection};

impl Config {
    /// Resolve every layer for the current user.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, None)
    }

    /// As [`Config::load`], reading the user layer under `home_dir`.
    ///
    /// # Errors
    ///
    /// See [`loader::load`].
    pub fn load_with_home(
        explicit: Option<&std::path::Path>,
        home_dir: &std::path::Path,
    ) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit, Some(home_dir))
    }

    /// One file over the embedded defaults.
    ///
    /// # Errors
    ///
    /// See [`loader::load_file`].
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
