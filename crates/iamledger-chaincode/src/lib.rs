//! iamledger chaincode - the `init` / `invoke` / `query` surface.
//!
//! The hosting platform hands the [`Dispatcher`] an operation name and its
//! string arguments. The dispatcher looks the name up in an operation table
//! built (and validated) at construction, checks the argument count, and
//! delegates to the ledger. Results come back as JSON whose field names match
//! the table columns.
//!
//! # Example
//!
//! ```
//! use iamledger_chaincode::Dispatcher;
//! use iamledger_core::Ledger;
//!
//! let dispatcher = Dispatcher::new(Ledger::in_memory()).unwrap();
//! dispatcher.init(&[]).unwrap();
//!
//! let args = ["srv1", "10.0.0.1", "/api"].map(String::from);
//! let payload = dispatcher.invoke("resourcecreate", &args).unwrap();
//! assert_eq!(
//!     String::from_utf8(payload).unwrap(),
//!     r#"{"ResourceName":"srv1","ResourceIP":"10.0.0.1","ResourceURL":"/api"}"#
//! );
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod dispatcher;
mod error;
mod handlers;
mod registry;

pub use dispatcher::Dispatcher;
pub use error::{ChaincodeError, ChaincodeResult};
pub use registry::{Arity, Handler, Operation, OperationTable};
