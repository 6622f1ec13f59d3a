//! Prelude module - commonly used types for convenient import.
//!
//! Use `use iamledger_core::prelude::*;` to import all essential types.

pub use crate::{LedgerError, LedgerResult};

pub use crate::{Ledger, Policy, PolicyRegistry, Resource, ResourceRegistry};

pub use crate::{AccessLogEntry, AccessLogger, ChainIssue, ChainVerification, LogRecord};

pub use crate::table::{ColumnDef, ColumnType, Row, TableSchema, TableStore, Value};
