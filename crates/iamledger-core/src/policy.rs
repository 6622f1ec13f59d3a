//! Authorization policies stored in the policy table.
//!
//! A policy grants (or denies) one user access to one resource URL. Rows are
//! keyed by `(UserName, IsAuthorized, PolicyName)`, so a user may hold any
//! number of granting and denying policies. `PolicyName` is also unique on
//! its own, which makes every policy addressable by name.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::table::{Predicate, Row, TableStore, Value};
use crate::tables::IA_MANAGER_TABLE;
use crate::tables::columns::{IS_AUTHORIZED, POLICY_NAME, RESOURCE_URL, USER_NAME};

/// A stored policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique policy name.
    #[serde(rename = "PolicyName")]
    pub policy_name: String,
    /// Resource URL the policy covers.
    #[serde(rename = "ResourceURL")]
    pub resource_url: String,
    /// Subject of the policy.
    #[serde(rename = "UserName")]
    pub user_name: String,
    /// Grant (`true`) or deny (`false`).
    #[serde(rename = "IsAuthorized")]
    pub is_authorized: bool,
}

impl Policy {
    /// Build a policy.
    pub fn new(
        policy_name: impl Into<String>,
        resource_url: impl Into<String>,
        user_name: impl Into<String>,
        is_authorized: bool,
    ) -> Self {
        Self {
            policy_name: policy_name.into(),
            resource_url: resource_url.into(),
            user_name: user_name.into(),
            is_authorized,
        }
    }

    fn validate(&self, operation: &str) -> LedgerResult<()> {
        for (field, value) in [
            (POLICY_NAME, &self.policy_name),
            (RESOURCE_URL, &self.resource_url),
            (USER_NAME, &self.user_name),
        ] {
            if value.is_empty() {
                return Err(LedgerError::invalid_argument(
                    operation,
                    format!("{field} must not be empty"),
                ));
            }
        }
        Ok(())
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(USER_NAME, self.user_name.as_str())
            .with(IS_AUTHORIZED, self.is_authorized)
            .with(POLICY_NAME, self.policy_name.as_str())
            .with(RESOURCE_URL, self.resource_url.as_str())
    }

    fn from_row(row: &Row) -> LedgerResult<Self> {
        Ok(Self {
            policy_name: row.string(IA_MANAGER_TABLE, POLICY_NAME)?,
            resource_url: row.string(IA_MANAGER_TABLE, RESOURCE_URL)?,
            user_name: row.string(IA_MANAGER_TABLE, USER_NAME)?,
            is_authorized: row.boolean(IA_MANAGER_TABLE, IS_AUTHORIZED)?,
        })
    }
}

/// Create, modify, delete and read policies.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    tables: Arc<TableStore>,
}

impl PolicyRegistry {
    /// Create a registry over an initialized table store.
    #[must_use]
    pub fn new(tables: Arc<TableStore>) -> Self {
        Self { tables }
    }

    /// Store a new policy and return it.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] naming the empty field, or
    /// [`LedgerError::DuplicateKey`] if the name is live.
    pub fn create(&self, policy: Policy) -> LedgerResult<Policy> {
        policy.validate("policycreate")?;
        self.tables.insert_row(IA_MANAGER_TABLE, policy.to_row())?;
        info!(
            policy = %policy.policy_name,
            user = %policy.user_name,
            authorized = policy.is_authorized,
            "created policy"
        );
        Ok(policy)
    }

    /// Replace the policy named `old_name` with `policy`.
    ///
    /// When the names match this is an in-place update; an absent old policy
    /// is not an error. Conflicts are detected before anything is deleted, so
    /// a rejected modify leaves the old policy in place.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] on an empty field,
    /// [`LedgerError::DuplicateKey`] if the new name belongs to another live
    /// policy.
    pub fn modify(&self, old_name: &str, policy: Policy) -> LedgerResult<Policy> {
        policy.validate("policymodify")?;
        if old_name.is_empty() {
            return Err(LedgerError::invalid_argument(
                "policymodify",
                "old PolicyName must not be empty",
            ));
        }

        if policy.policy_name != old_name && self.find(&policy.policy_name)?.is_some() {
            return Err(LedgerError::DuplicateKey {
                table: IA_MANAGER_TABLE.to_owned(),
                key: format!("{POLICY_NAME}={}", policy.policy_name),
            });
        }

        self.delete(old_name)?;
        self.tables.insert_row(IA_MANAGER_TABLE, policy.to_row())?;
        info!(old = %old_name, new = %policy.policy_name, "modified policy");
        Ok(policy)
    }

    /// Delete a policy by name. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] on an empty name; otherwise only
    /// substrate faults.
    pub fn delete(&self, policy_name: &str) -> LedgerResult<bool> {
        if policy_name.is_empty() {
            return Err(LedgerError::invalid_argument(
                "policydelete",
                "PolicyName must not be empty",
            ));
        }
        let existed = self
            .tables
            .delete_row_by(IA_MANAGER_TABLE, POLICY_NAME, &Value::from(policy_name))?;
        if existed {
            info!(policy = %policy_name, "deleted policy");
        }
        Ok(existed)
    }

    /// Read a policy by name.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if no live policy has that name.
    pub fn get(&self, policy_name: &str) -> LedgerResult<Policy> {
        let row = self
            .tables
            .get_row_by(IA_MANAGER_TABLE, POLICY_NAME, &Value::from(policy_name))?;
        Policy::from_row(&row)
    }

    fn find(&self, policy_name: &str) -> LedgerResult<Option<Policy>> {
        self.tables
            .find_row_by(IA_MANAGER_TABLE, POLICY_NAME, &Value::from(policy_name))?
            .as_ref()
            .map(Policy::from_row)
            .transpose()
    }

    /// All live policies, in composite-key order.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored row is corrupt or the substrate fails.
    pub fn list(&self) -> LedgerResult<Vec<Policy>> {
        self.tables
            .scan_rows(IA_MANAGER_TABLE, None)?
            .map(|row| row.and_then(|r| Policy::from_row(&r)))
            .collect()
    }

    /// Policies held by one user.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored row is corrupt or the substrate fails.
    pub fn list_for_user(&self, user_name: &str) -> LedgerResult<Vec<Policy>> {
        self.tables
            .scan_rows(IA_MANAGER_TABLE, Some(Predicate::equals(USER_NAME, user_name)))?
            .map(|row| row.and_then(|r| Policy::from_row(&r)))
            .collect()
    }

    /// Whether `user_name` may access `resource_url`.
    ///
    /// Granted when some granting policy of the user names the URL and no
    /// denying policy does. Deny wins.
    ///
    /// # Errors
    ///
    /// Returns an error if a stored row is corrupt or the substrate fails.
    pub fn decide(&self, user_name: &str, resource_url: &str) -> LedgerResult<bool> {
        let mut granted = false;
        for policy in self.list_for_user(user_name)? {
            if policy.resource_url != resource_url {
                continue;
            }
            if !policy.is_authorized {
                debug!(user = %user_name, url = %resource_url, policy = %policy.policy_name, "access denied");
                return Ok(false);
            }
            granted = true;
        }
        debug!(user = %user_name, url = %resource_url, granted, "access decision");
        Ok(granted)
    }
}
