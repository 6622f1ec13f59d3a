//! CLI command implementations.

pub(crate) mod config;
pub(crate) mod ledger;
