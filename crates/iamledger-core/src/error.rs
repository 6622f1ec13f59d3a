//! Ledger error types.

use thiserror::Error;

use crate::table::ColumnType;

/// Errors raised by the table layer, the registries and the access log.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Wrong arity, empty required field or unparsable argument.
    #[error("invalid argument for {operation}: {message}")]
    InvalidArgument {
        /// Operation that rejected the argument.
        operation: String,
        /// What was wrong.
        message: String,
    },

    /// Uniqueness violation on create.
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey {
        /// Table holding the conflicting row.
        table: String,
        /// The conflicting key, rendered for operators.
        key: String,
    },

    /// No row lives at the requested key.
    #[error("not found in {table}: {key}")]
    NotFound {
        /// Table that was searched.
        table: String,
        /// The key that was looked up.
        key: String,
    },

    /// The table was never created.
    #[error("unknown table: {table}")]
    UnknownTable {
        /// Table name.
        table: String,
    },

    /// The table already exists.
    #[error("table already exists: {table}")]
    SchemaExists {
        /// Table name.
        table: String,
    },

    /// The schema is malformed.
    #[error("invalid schema for {table}: {reason}")]
    InvalidSchema {
        /// Table name.
        table: String,
        /// Why the schema was rejected.
        reason: String,
    },

    /// A column value does not match its declared type.
    #[error("type mismatch in {table}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        /// Table name.
        table: String,
        /// Offending column.
        column: String,
        /// Declared type.
        expected: ColumnType,
        /// Type of the supplied value.
        found: ColumnType,
    },

    /// A required column is absent.
    #[error("missing column {table}.{column}")]
    MissingColumn {
        /// Table name.
        table: String,
        /// Absent column.
        column: String,
    },

    /// A row carries a column the schema does not declare.
    #[error("unknown column {table}.{column}")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Undeclared column.
        column: String,
    },

    /// A log range was malformed.
    #[error("invalid range [{from}, {to}): {reason}")]
    InvalidRange {
        /// Start index (inclusive).
        from: u64,
        /// End index (exclusive).
        to: u64,
        /// Why the range was rejected.
        reason: String,
    },

    /// The substrate failed. Fatal to the current call, never retried here.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::InvalidArgument`].
    pub fn invalid_argument(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error reports an absent row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<iamledger_storage::StorageError> for LedgerError {
    fn from(e: iamledger_storage::StorageError) -> Self {
        Self::StorageError(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
