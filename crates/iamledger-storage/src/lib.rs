//! iamledger storage: the raw key-value substrate.
//!
//! The hosting ledger platform owns durability and replication. This crate
//! models the narrow interface it exposes to the authorization core:
//! namespaced byte values with `get`/`set`/`delete` and ordered scans.
//!
//! # Backends
//!
//! | Backend | Feature | Use |
//! |---------|---------|-----|
//! | [`MemoryKvStore`] | always | tests, ephemeral ledgers |
//! | `SurrealKvStore` | `kv` | persistent local ledger state |

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvEntry, KvStore, MemoryKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
