//! iamledger telemetry - logging setup on top of `tracing`.
//!
//! # Example
//!
//! ```rust,no_run
//! use iamledger_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), iamledger_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("iamledger_core=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("ledger starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
