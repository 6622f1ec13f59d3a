//! Dispatcher error types.

use iamledger_core::LedgerError;
use thiserror::Error;

/// Errors returned to the hosting platform.
#[derive(Debug, Error)]
pub enum ChaincodeError {
    /// The ledger rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// No operation is registered under this name.
    #[error("unknown operation: {operation}")]
    UnknownOperation {
        /// The name that was requested.
        operation: String,
    },

    /// `init` was already called for this ledger.
    #[error("ledger already initialized")]
    AlreadyInitialized,

    /// An operation arrived before `init`.
    #[error("ledger not initialized")]
    NotInitialized,

    /// The operation table is malformed.
    #[error("cannot register operation '{name}': {reason}")]
    Registration {
        /// Offending operation name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ChaincodeError {
    /// The wrapped ledger error, if any.
    #[must_use]
    pub fn ledger_error(&self) -> Option<&LedgerError> {
        match self {
            Self::Ledger(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for dispatcher operations.
pub type ChaincodeResult<T> = Result<T, ChaincodeError>;
