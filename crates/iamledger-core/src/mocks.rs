//! Substrate doubles for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use iamledger_storage::{KvEntry, KvStore, MemoryKvStore, StorageError, StorageResult};

/// In-memory store whose writes to chosen namespaces fail on demand.
#[derive(Debug, Default)]
pub(crate) struct FailingKvStore {
    inner: MemoryKvStore,
    /// `(operation, namespace)` pairs that fail.
    broken: Mutex<HashSet<(&'static str, String)>>,
}

impl FailingKvStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reject every `set` and `delete` on `namespace` from now on.
    pub(crate) fn break_writes(&self, namespace: &str) {
        let mut broken = self.broken.lock().unwrap();
        broken.insert(("set", namespace.to_owned()));
        broken.insert(("delete", namespace.to_owned()));
    }

    /// Reject only `delete` on `namespace`.
    pub(crate) fn break_deletes(&self, namespace: &str) {
        self.broken
            .lock()
            .unwrap()
            .insert(("delete", namespace.to_owned()));
    }

    /// Accept writes everywhere again.
    pub(crate) fn heal(&self) {
        self.broken.lock().unwrap().clear();
    }

    fn check(&self, operation: &'static str, namespace: &str) -> StorageResult<()> {
        if self
            .broken
            .lock()
            .unwrap()
            .contains(&(operation, namespace.to_owned()))
        {
            return Err(StorageError::Backend {
                operation,
                reason: format!("injected failure on {namespace}"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, namespace: &str, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.check("set", namespace)?;
        self.inner.set(namespace, key, value).await
    }

    async fn delete(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        self.check("delete", namespace)?;
        self.inner.delete(namespace, key).await
    }

    async fn exists(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        self.inner.exists(namespace, key).await
    }

    async fn scan(&self, namespace: &str) -> StorageResult<Vec<KvEntry>> {
        self.inner.scan(namespace).await
    }

    async fn list_keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        self.inner.list_keys(namespace).await
    }
}
