//! The single entry point the hosting platform calls.

use std::sync::atomic::{AtomicBool, Ordering};

use iamledger_core::{Ledger, LedgerError};
use tracing::{debug, info, warn};

use crate::error::{ChaincodeError, ChaincodeResult};
use crate::handlers::{invoke_operations, query_operations};
use crate::registry::OperationTable;

/// Routes `init`, `invoke` and `query` calls to the ledger.
///
/// `init` is a one-shot transition: it creates the ledger tables and every
/// later `init` fails. `invoke` and `query` are refused until it has run.
#[derive(Debug)]
pub struct Dispatcher {
    ledger: Ledger,
    invoke_ops: OperationTable,
    query_ops: OperationTable,
    initialized: AtomicBool,
}

impl Dispatcher {
    /// Build the operation tables over `ledger`.
    ///
    /// A ledger whose tables already exist counts as initialized.
    ///
    /// # Errors
    ///
    /// [`ChaincodeError::Registration`] if an operation table is malformed,
    /// or a ledger error if the substrate cannot be read.
    pub fn new(ledger: Ledger) -> ChaincodeResult<Self> {
        let invoke_ops = OperationTable::from_operations(invoke_operations())?;
        let query_ops = OperationTable::from_operations(query_operations())?;
        let initialized = ledger.is_initialized()?;
        debug!(initialized, "dispatcher ready");
        Ok(Self {
            ledger,
            invoke_ops,
            query_ops,
            initialized: AtomicBool::new(initialized),
        })
    }

    /// Create the ledger tables.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if any argument is given,
    /// [`ChaincodeError::AlreadyInitialized`] on every call after the first.
    pub fn init(&self, args: &[String]) -> ChaincodeResult<()> {
        if !args.is_empty() {
            return Err(LedgerError::invalid_argument(
                "init",
                format!("expected 0 arguments, got {}", args.len()),
            )
            .into());
        }
        if self.initialized.load(Ordering::Acquire) {
            warn!("init called on an initialized ledger");
            return Err(ChaincodeError::AlreadyInitialized);
        }

        self.ledger.initialize()?;
        self.initialized.store(true, Ordering::Release);
        info!("chaincode initialized");
        Ok(())
    }

    /// Run a state-changing operation and return its JSON payload.
    ///
    /// # Errors
    ///
    /// [`ChaincodeError::NotInitialized`], [`ChaincodeError::UnknownOperation`],
    /// or the operation's own error.
    pub fn invoke(&self, operation: &str, args: &[String]) -> ChaincodeResult<Vec<u8>> {
        self.dispatch(&self.invoke_ops, "invoke", operation, args)
    }

    /// Run a read-only operation and return its JSON payload.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke); absent records fail with
    /// [`LedgerError::NotFound`].
    pub fn query(&self, operation: &str, args: &[String]) -> ChaincodeResult<Vec<u8>> {
        self.dispatch(&self.query_ops, "query", operation, args)
    }

    fn dispatch(
        &self,
        table: &OperationTable,
        surface: &str,
        operation: &str,
        args: &[String],
    ) -> ChaincodeResult<Vec<u8>> {
        if !self.is_initialized() {
            return Err(ChaincodeError::NotInitialized);
        }
        debug!(surface, operation, args = args.len(), "dispatching");
        let result = table.call(&self.ledger, operation, args);
        if let Err(e) = &result {
            debug!(surface, operation, error = %e, "operation failed");
        }
        result
    }

    /// Whether `init` has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Names accepted by [`invoke`](Self::invoke).
    #[must_use]
    pub fn invoke_operations(&self) -> Vec<&'static str> {
        self.invoke_ops.names()
    }

    /// Names accepted by [`query`](Self::query).
    #[must_use]
    pub fn query_operations(&self) -> Vec<&'static str> {
        self.query_ops.names()
    }

    /// The underlying ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
