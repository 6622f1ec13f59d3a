//! Storage error types.

use std::path::PathBuf;

/// Errors from the key-value substrate.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A namespace or key cannot be stored.
    #[error("invalid {part} {value:?}: {reason}")]
    InvalidAddress {
        /// `"namespace"` or `"key"`.
        part: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The persistent store could not be opened.
    #[error("failed to open store at {}: {reason}", path.display())]
    Open {
        /// Store directory.
        path: PathBuf,
        /// Backend message.
        reason: String,
    },

    /// A backend call failed.
    #[error("{operation} failed: {reason}")]
    Backend {
        /// Substrate operation that failed.
        operation: &'static str,
        /// Backend message.
        reason: String,
    },
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
