//! Protected resources, keyed by name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{LedgerError, LedgerResult};
use crate::table::{Row, TableStore, Value};
use crate::tables::RESOURCE_TABLE;
use crate::tables::columns::{RESOURCE_IP, RESOURCE_NAME, RESOURCE_URL};

/// A registered resource and its network identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource name.
    #[serde(rename = "ResourceName")]
    pub resource_name: String,
    /// Network address.
    #[serde(rename = "ResourceIP")]
    pub resource_ip: String,
    /// URL the resource is served under.
    #[serde(rename = "ResourceURL")]
    pub resource_url: String,
}

impl Resource {
    /// Build a resource.
    pub fn new(
        resource_name: impl Into<String>,
        resource_ip: impl Into<String>,
        resource_url: impl Into<String>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            resource_ip: resource_ip.into(),
            resource_url: resource_url.into(),
        }
    }

    fn from_row(row: &Row) -> LedgerResult<Self> {
        Ok(Self {
            resource_name: row.string(RESOURCE_TABLE, RESOURCE_NAME)?,
            resource_ip: row.string(RESOURCE_TABLE, RESOURCE_IP)?,
            resource_url: row.string(RESOURCE_TABLE, RESOURCE_URL)?,
        })
    }
}

/// Registers and reads resources.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    tables: Arc<TableStore>,
}

impl ResourceRegistry {
    /// Create a registry over an initialized table store.
    #[must_use]
    pub fn new(tables: Arc<TableStore>) -> Self {
        Self { tables }
    }

    /// Register a resource.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] on an empty field,
    /// [`LedgerError::DuplicateKey`] if the name is taken. The existing row
    /// is left unchanged.
    pub fn create(&self, resource: Resource) -> LedgerResult<Resource> {
        for (field, value) in [
            (RESOURCE_NAME, &resource.resource_name),
            (RESOURCE_IP, &resource.resource_ip),
            (RESOURCE_URL, &resource.resource_url),
        ] {
            if value.is_empty() {
                return Err(LedgerError::invalid_argument(
                    "resourcecreate",
                    format!("{field} must not be empty"),
                ));
            }
        }

        let row = Row::new()
            .with(RESOURCE_NAME, resource.resource_name.as_str())
            .with(RESOURCE_IP, resource.resource_ip.as_str())
            .with(RESOURCE_URL, resource.resource_url.as_str());
        self.tables.insert_row(RESOURCE_TABLE, row)?;
        info!(resource = %resource.resource_name, url = %resource.resource_url, "registered resource");
        Ok(resource)
    }

    /// Read a resource by name.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if it was never registered.
    pub fn get(&self, resource_name: &str) -> LedgerResult<Resource> {
        let row = self
            .tables
            .get_row(RESOURCE_TABLE, &[Value::from(resource_name)])?;
        Resource::from_row(&row)
    }

    /// All resources in name order.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored row is corrupt or the substrate fails.
    pub fn list(&self) -> LedgerResult<Vec<Resource>> {
        self.tables
            .scan_rows(RESOURCE_TABLE, None)?
            .map(|row| row.and_then(|r| Resource::from_row(&r)))
            .collect()
    }
}
