//! Ledger facade bundling the table store, registries and access log.

use std::sync::Arc;

use iamledger_storage::{KvStore, MemoryKvStore};
use tracing::info;

use crate::access_log::{AccessLogEntry, AccessLogger, LogRecord};
use crate::error::LedgerResult;
use crate::policy::PolicyRegistry;
use crate::resource::ResourceRegistry;
use crate::table::TableStore;
use crate::tables::ledger_schemas;

/// The ledger core over one substrate.
#[derive(Debug, Clone)]
pub struct Ledger {
    tables: Arc<TableStore>,
    policies: PolicyRegistry,
    resources: ResourceRegistry,
    access_log: AccessLogger,
}

impl Ledger {
    /// Create a ledger over a substrate. Call [`initialize`](Self::initialize)
    /// once per substrate before use.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        let tables = Arc::new(TableStore::new(kv));
        Self {
            policies: PolicyRegistry::new(Arc::clone(&tables)),
            resources: ResourceRegistry::new(Arc::clone(&tables)),
            access_log: AccessLogger::new(Arc::clone(&tables)),
            tables,
        }
    }

    /// Create a ledger over a fresh in-memory substrate.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKvStore::new()))
    }

    /// Cap the span of a single log fetch.
    #[must_use]
    pub fn with_max_fetch_span(mut self, max: Option<u64>) -> Self {
        self.access_log = self.access_log.with_max_fetch_span(max);
        self
    }

    /// Create every ledger table.
    ///
    /// # Errors
    ///
    /// [`LedgerError::SchemaExists`](crate::LedgerError::SchemaExists) if a
    /// table already exists.
    pub fn initialize(&self) -> LedgerResult<()> {
        for schema in ledger_schemas() {
            self.tables.create_table(schema)?;
        }
        info!("ledger initialized");
        Ok(())
    }

    /// Whether every ledger table exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate fails.
    pub fn is_initialized(&self) -> LedgerResult<bool> {
        for schema in ledger_schemas() {
            if !self.tables.table_exists(&schema.name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// The typed table layer.
    #[must_use]
    pub fn tables(&self) -> &Arc<TableStore> {
        &self.tables
    }

    /// Policy registry.
    #[must_use]
    pub fn policies(&self) -> &PolicyRegistry {
        &self.policies
    }

    /// Resource registry.
    #[must_use]
    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// Access log.
    #[must_use]
    pub fn access_log(&self) -> &AccessLogger {
        &self.access_log
    }

    /// Decide whether `user_name` may access a registered resource and
    /// record the decision.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`](crate::LedgerError::NotFound) if the
    /// resource is not registered, or any error from
    /// [`AccessLogger::record`].
    pub fn check_access(
        &self,
        resource_name: &str,
        user_name: &str,
        enroll_id: &str,
        date_time: &str,
    ) -> LedgerResult<LogRecord> {
        let resource = self.resources.get(resource_name)?;
        let is_authorized = self.policies.decide(user_name, &resource.resource_url)?;
        self.access_log.record(AccessLogEntry {
            resource_name: resource.resource_name,
            resource_ip: resource.resource_ip,
            resource_url: resource.resource_url,
            user_name: user_name.to_owned(),
            enroll_id: enroll_id.to_owned(),
            is_authorized,
            date_time: date_time.to_owned(),
        })
    }
}
