//! Synchronous bridge onto the async [`KvStore`](iamledger_storage::KvStore).
//!
//! The ledger core has no suspension points of its own: every operation
//! completes or fails before returning. Substrate calls are in-process, so
//! blocking on them is cheap.

use std::future::Future;

use iamledger_storage::StorageResult;

use crate::error::{LedgerError, LedgerResult};

/// Run a substrate future to completion.
///
/// Inside a tokio runtime the future is driven from a scoped thread, which
/// avoids the "cannot `block_on` from within a runtime" panic. Outside a
/// runtime a throwaway current-thread runtime is built.
pub(crate) fn block_on<F, T>(f: F) -> LedgerResult<T>
where
    F: Future<Output = StorageResult<T>> + Send,
    T: Send,
{
    let output = match tokio::runtime::Handle::try_current() {
        Ok(handle) => std::thread::scope(|s| s.spawn(|| handle.block_on(f)).join())
            .map_err(|_| LedgerError::StorageError("storage thread panicked".to_owned()))?,
        Err(_) => tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| LedgerError::StorageError(format!("failed to build runtime: {e}")))?
            .block_on(f),
    };
    output.map_err(LedgerError::from)
}
