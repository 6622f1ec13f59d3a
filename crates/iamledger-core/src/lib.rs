//! iamledger core - typed ledger tables, policy and resource registries,
//! and the hash-chained access log.
//!
//! This crate provides:
//! - [`TableStore`](table::TableStore): typed tables with composite keys and
//!   unique columns over a raw [`KvStore`](iamledger_storage::KvStore)
//! - [`PolicyRegistry`] and [`ResourceRegistry`] for entity lifecycle
//! - [`AccessLogger`]: append-only log where every record links to the hash
//!   of its predecessor
//!
//! # Example
//!
//! ```
//! use iamledger_core::{AccessLogEntry, Ledger, Policy, Resource};
//!
//! let ledger = Ledger::in_memory();
//! ledger.initialize().unwrap();
//!
//! ledger.resources().create(Resource::new("srv1", "10.0.0.1", "/api")).unwrap();
//! ledger.policies().create(Policy::new("pol1", "/api", "alice", true)).unwrap();
//!
//! let record = ledger
//!     .check_access("srv1", "alice", "enroll-1", "2024-01-01T00:00:00Z")
//!     .unwrap();
//! assert!(record.entry.is_authorized);
//! assert!(ledger.access_log().verify().unwrap().valid);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod table;
pub mod tables;

mod access_log;
mod bridge;
mod error;
mod hash;
mod ledger;
#[cfg(test)]
mod mocks;
mod policy;
mod resource;

pub use access_log::{AccessLogEntry, AccessLogger, ChainIssue, ChainVerification, LogRecord};
pub use error::{LedgerError, LedgerResult};
pub use hash::ContentHash;
pub use ledger::Ledger;
pub use policy::{Policy, PolicyRegistry};
pub use resource::{Resource, ResourceRegistry};
