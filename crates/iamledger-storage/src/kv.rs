//! Namespaced byte storage.
//!
//! [`KvStore`] is the whole of what the ledger platform lends the
//! authorization core: opaque values addressed by `(namespace, key)`. Both
//! parts are non-empty UTF-8 without NUL, since the persistent backend joins
//! them with a NUL byte.
//!
//! [`KvStore::scan`] and [`KvStore::list_keys`] yield keys in ascending byte
//! order. Callers that need insertion order encode it into the key (the
//! access log zero-pads its sequence numbers).

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StorageError, StorageResult};

const SEPARATOR: char = '\0';

fn check(part: &'static str, value: &str) -> StorageResult<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value.contains(SEPARATOR) {
        "contains a null byte"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidAddress {
        part,
        value: value.to_owned(),
        reason,
    })
}

fn check_address(namespace: &str, key: &str) -> StorageResult<()> {
    check("namespace", namespace)?;
    check("key", key)
}

/// A key and the value stored under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// Key within its namespace.
    pub key: String,
    /// Stored bytes.
    pub value: Vec<u8>,
}

/// Byte-level state store shared by every ledger table.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Value under `key`, or `None`.
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing what was there.
    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`. Returns whether it was present.
    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Whether `key` is present.
    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Every entry of `namespace`, keys ascending.
    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>>;

    /// Every key of `namespace`, ascending.
    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>>;
}

type Namespace = BTreeMap<String, Vec<u8>>;

/// Process-local store. State lives as long as the value does.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    namespaces: RwLock<BTreeMap<String, Namespace>>,
}

impl MemoryKvStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `f` to a namespace if it has ever been written.
    fn view<T>(
        &self,
        operation: &'static str,
        namespace: &str,
        f: impl FnOnce(&Namespace) -> T,
    ) -> StorageResult<Option<T>> {
        let guard = self
            .namespaces
            .read()
            .map_err(|e| lock_failed(operation, &e))?;
        Ok(guard.get(namespace).map(f))
    }
}

fn lock_failed(operation: &'static str, e: &impl std::fmt::Display) -> StorageError {
    StorageError::Backend {
        operation,
        reason: e.to_string(),
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        check_address(namespace, key)?;
        Ok(self
            .view("get", namespace, |ns| ns.get(key).cloned())?
            .flatten())
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        check_address(namespace, key)?;
        self.namespaces
            .write()
            .map_err(|e| lock_failed("set", &e))?
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        check_address(namespace, key)?;
        let mut guard = self
            .namespaces
            .write()
            .map_err(|e| lock_failed("delete", &e))?;
        Ok(guard
            .get_mut(namespace)
            .is_some_and(|ns| ns.remove(key).is_some()))
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        check_address(namespace, key)?;
        Ok(self
            .view("exists", namespace, |ns| ns.contains_key(key))?
            .unwrap_or(false))
    }

    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>> {
        check("namespace", namespace)?;
        let entries = self.view("scan", namespace, |ns| {
            ns.iter()
                .map(|(key, value)| KvEntry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        })?;
        Ok(entries.unwrap_or_default())
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        check("namespace", namespace)?;
        let keys = self.view("list_keys", namespace, |ns| ns.keys().cloned().collect())?;
        Ok(keys.unwrap_or_default())
    }
}

#[cfg(feature = "kv")]
pub use surreal::SurrealKvStore;

#[cfg(feature = "kv")]
mod surreal {
    use std::path::Path;

    use async_trait::async_trait;
    use surrealkv::{Mode, Tree, TreeBuilder};

    use super::{KvEntry, KvStore, SEPARATOR, check, check_address};
    use crate::error::{StorageError, StorageResult};

    /// On-disk store backed by a `SurrealKV` tree.
    ///
    /// Each write is its own transaction, committed before the call returns.
    pub struct SurrealKvStore {
        tree: Tree,
    }

    impl std::fmt::Debug for SurrealKvStore {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SurrealKvStore").finish_non_exhaustive()
        }
    }

    fn backend(operation: &'static str) -> impl Fn(surrealkv::Error) -> StorageError {
        move |e| StorageError::Backend {
            operation,
            reason: e.to_string(),
        }
    }

    /// `namespace NUL key`
    fn physical_key(namespace: &str, key: &str) -> Vec<u8> {
        let mut raw = String::with_capacity(
            namespace.len().saturating_add(key.len()).saturating_add(1),
        );
        raw.push_str(namespace);
        raw.push(SEPARATOR);
        raw.push_str(key);
        raw.into_bytes()
    }

    /// Half-open byte range holding every key of `namespace`.
    fn namespace_range(namespace: &str) -> (Vec<u8>, Vec<u8>) {
        let mut start = namespace.as_bytes().to_vec();
        let mut end = start.clone();
        start.push(0);
        end.push(1);
        (start, end)
    }

    fn logical_key(namespace: &str, raw: &[u8]) -> Option<String> {
        let rest = raw.strip_prefix(namespace.as_bytes())?.strip_prefix(&[0u8])?;
        if rest.is_empty() {
            return None;
        }
        String::from_utf8(rest.to_vec()).ok()
    }

    impl SurrealKvStore {
        /// Open the store in `path`, creating it if needed.
        ///
        /// # Errors
        ///
        /// [`StorageError::Open`] if the tree cannot be built.
        pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
            let path = path.as_ref();
            let tree = TreeBuilder::new()
                .with_path(path.to_path_buf())
                .build()
                .map_err(|e| StorageError::Open {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            tracing::debug!(path = %path.display(), "opened SurrealKV store");
            Ok(Self { tree })
        }

        /// Flush and close the tree.
        ///
        /// # Errors
        ///
        /// [`StorageError::Backend`] if the flush fails.
        pub async fn close(&self) -> StorageResult<()> {
            self.tree.close().await.map_err(backend("close"))
        }

        /// Raw keys of `namespace`, ascending.
        fn raw_keys(&self, namespace: &str) -> StorageResult<Vec<Vec<u8>>> {
            let (start, end) = namespace_range(namespace);
            let tx = self
                .tree
                .begin_with_mode(Mode::ReadOnly)
                .map_err(backend("scan"))?;
            let mut iter = tx.range(&start, &end).map_err(backend("scan"))?;
            iter.seek_first().map_err(backend("scan"))?;

            let mut keys = Vec::new();
            while iter.valid() {
                keys.push(iter.key().to_vec());
                iter.next().map_err(backend("scan"))?;
            }
            Ok(keys)
        }
    }

    #[async_trait]
    impl KvStore for SurrealKvStore {
        async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
            check_address(namespace, key)?;
            let tx = self
                .tree
                .begin_with_mode(Mode::ReadOnly)
                .map_err(backend("get"))?;
            tx.get(&physical_key(namespace, key)).map_err(backend("get"))
        }

        async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
            check_address(namespace, key)?;
            let mut tx = self.tree.begin().map_err(backend("set"))?;
            tx.set(&physical_key(namespace, key), &value)
                .map_err(backend("set"))?;
            tx.commit().await.map_err(backend("set"))
        }

        async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
            check_address(namespace, key)?;
            let raw = physical_key(namespace, key);
            let mut tx = self.tree.begin().map_err(backend("delete"))?;
            if tx.get(&raw).map_err(backend("delete"))?.is_none() {
                return Ok(false);
            }
            tx.delete(&raw).map_err(backend("delete"))?;
            tx.commit().await.map_err(backend("delete"))?;
            Ok(true)
        }

        async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
            Ok(self.get(namespace, key).await?.is_some())
        }

        async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>> {
            check("namespace", namespace)?;
            let raw_keys = self.raw_keys(namespace)?;
            let tx = self
                .tree
                .begin_with_mode(Mode::ReadOnly)
                .map_err(backend("scan"))?;

            let mut entries = Vec::with_capacity(raw_keys.len());
            for raw in raw_keys {
                let Some(key) = logical_key(namespace, &raw) else {
                    continue;
                };
                if let Some(value) = tx.get(&raw).map_err(backend("scan"))? {
                    entries.push(KvEntry { key, value });
                }
            }
            Ok(entries)
        }

        async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
            check("namespace", namespace)?;
            Ok(self
                .raw_keys(namespace)?
                .iter()
                .filter_map(|raw| logical_key(namespace, raw))
                .collect())
        }
    }
}
