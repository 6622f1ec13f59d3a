//! Operation table: name to arity and handler.

use std::collections::HashMap;
use std::fmt;

use iamledger_core::{Ledger, LedgerError};
use tracing::debug;

use crate::error::{ChaincodeError, ChaincodeResult};

/// Signature shared by every operation handler.
///
/// Handlers receive arguments whose count already matches the operation's
/// [`Arity`].
pub type Handler = fn(&Ledger, &[String]) -> ChaincodeResult<Vec<u8>>;

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many arguments.
    Exact(usize),
    /// Between `min` and `max` arguments, inclusive.
    Between(usize, usize),
}

impl Arity {
    fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::Between(min, max) => (min..=max).contains(&count),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(1) => f.write_str("1 argument"),
            Self::Exact(n) => write!(f, "{n} arguments"),
            Self::Between(min, max) => write!(f, "{min} to {max} arguments"),
        }
    }
}

/// A registered operation.
#[derive(Clone, Copy)]
pub struct Operation {
    /// Exact-match name.
    pub name: &'static str,
    /// Accepted argument counts.
    pub arity: Arity,
    /// Handler run once the arity check passes.
    pub handler: Handler,
}

impl Operation {
    /// Describe an operation.
    #[must_use]
    pub const fn new(name: &'static str, arity: Arity, handler: Handler) -> Self {
        Self {
            name,
            arity,
            handler,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Operations addressable by name.
#[derive(Debug, Default)]
pub struct OperationTable {
    operations: HashMap<&'static str, Operation>,
}

impl OperationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting the first bad registration.
    ///
    /// # Errors
    ///
    /// See [`register`](Self::register).
    pub fn from_operations(operations: impl IntoIterator<Item = Operation>) -> ChaincodeResult<Self> {
        let mut table = Self::new();
        for op in operations {
            table.register(op)?;
        }
        Ok(table)
    }

    /// Add an operation.
    ///
    /// # Errors
    ///
    /// [`ChaincodeError::Registration`] if the name is empty, contains
    /// anything but lowercase ASCII letters and digits, or is taken.
    pub fn register(&mut self, op: Operation) -> ChaincodeResult<()> {
        let reject = |reason: &str| ChaincodeError::Registration {
            name: op.name.to_owned(),
            reason: reason.to_owned(),
        };
        if op.name.is_empty() {
            return Err(reject("name must not be empty"));
        }
        if !op
            .name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(reject("name must be lowercase ASCII letters and digits"));
        }
        if self.operations.contains_key(op.name) {
            return Err(reject("name already registered"));
        }

        debug!(operation = op.name, arity = %op.arity, "registered operation");
        self.operations.insert(op.name, op);
        Ok(())
    }

    /// Look up an operation.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Operation> {
        self.operations.get(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.operations.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Check arity, then run the handler.
    ///
    /// # Errors
    ///
    /// [`ChaincodeError::UnknownOperation`], an arity
    /// [`LedgerError::InvalidArgument`], or whatever the handler returns.
    pub fn call(&self, ledger: &Ledger, name: &str, args: &[String]) -> ChaincodeResult<Vec<u8>> {
        let op = self.get(name).ok_or_else(|| ChaincodeError::UnknownOperation {
            operation: name.to_owned(),
        })?;
        if !op.arity.accepts(args.len()) {
            return Err(LedgerError::invalid_argument(
                op.name,
                format!("expected {}, got {}", op.arity, args.len()),
            )
            .into());
        }
        (op.handler)(ledger, args)
    }
}
