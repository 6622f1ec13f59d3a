//! Table schemas: typed columns, composite keys and unique columns.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::key;
use super::value::{ColumnType, Row, Value};
use crate::error::{LedgerError, LedgerResult};

/// A column declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
    /// Part of the composite key. Key columns are always required.
    pub key: bool,
    /// Must be present in every row.
    pub required: bool,
    /// At most one live row may hold a given value.
    pub unique: bool,
}

impl ColumnDef {
    /// A composite-key column.
    #[must_use]
    pub fn key(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            key: true,
            required: true,
            unique: false,
        }
    }

    /// A non-key column that every row must carry.
    #[must_use]
    pub fn required(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            key: false,
            required: true,
            unique: false,
        }
    }

    /// A non-key column that may be absent.
    #[must_use]
    pub fn optional(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            key: false,
            required: false,
            unique: false,
        }
    }

    /// Mark the column unique across live rows.
    ///
    /// On a key column this makes one component of a wider key unique on its
    /// own, so the row can be found by that component alone.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// A named table schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Columns in declaration order. Key columns form the composite key in
    /// this order.
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Create a schema. Call [`validate`](Self::validate) before use.
    #[must_use]
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> LedgerError {
        LedgerError::InvalidSchema {
            table: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Check the schema is well formed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidSchema`] if the table or a column is unnamed,
    /// a column name repeats, a key column is optional, or no column is
    /// part of the key.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid("table name must not be empty"));
        }
        if self.name.contains(':') || self.name.contains('\0') {
            return Err(self.invalid("table name must not contain ':' or null bytes"));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.trim().is_empty() {
                return Err(self.invalid("column name must not be empty"));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(self.invalid(format!("duplicate column '{}'", column.name)));
            }
            if column.key && !column.required {
                return Err(self.invalid(format!("key column '{}' must be required", column.name)));
            }
        }

        if !self.columns.iter().any(|c| c.key) {
            return Err(self.invalid("at least one column must be part of the key"));
        }
        Ok(())
    }

    /// Look up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Key columns in key order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.key)
    }

    /// Columns with a secondary index, key columns included.
    pub fn unique_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.unique)
    }

    fn check_type(&self, column: &ColumnDef, value: &Value) -> LedgerResult<()> {
        if value.column_type() == column.column_type {
            Ok(())
        } else {
            Err(LedgerError::TypeMismatch {
                table: self.name.clone(),
                column: column.name.clone(),
                expected: column.column_type,
                found: value.column_type(),
            })
        }
    }

    /// Check a row against the schema.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownColumn`], [`LedgerError::TypeMismatch`] or
    /// [`LedgerError::MissingColumn`].
    pub fn validate_row(&self, row: &Row) -> LedgerResult<()> {
        for (name, value) in row.iter() {
            let column = self.column(name).ok_or_else(|| LedgerError::UnknownColumn {
                table: self.name.clone(),
                column: name.clone(),
            })?;
            self.check_type(column, value)?;
        }
        for column in self.columns.iter().filter(|c| c.required) {
            if row.get(&column.name).is_none() {
                return Err(LedgerError::MissingColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Encode the composite key of a (validated) row.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MissingColumn`] if a key column is absent.
    pub fn row_key(&self, row: &Row) -> LedgerResult<String> {
        let mut values = Vec::new();
        for column in self.key_columns() {
            let value = row.get(&column.name).ok_or_else(|| LedgerError::MissingColumn {
                table: self.name.clone(),
                column: column.name.clone(),
            })?;
            values.push(value);
        }
        Ok(key::encode(values))
    }

    /// Encode a composite key supplied as values in key order.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] on arity mismatch and
    /// [`LedgerError::TypeMismatch`] on a wrongly typed component.
    pub fn encode_key(&self, values: &[Value]) -> LedgerResult<String> {
        let columns: Vec<&ColumnDef> = self.key_columns().collect();
        if columns.len() != values.len() {
            return Err(LedgerError::invalid_argument(
                format!("{} key", self.name),
                format!(
                    "expected {} key components, got {}",
                    columns.len(),
                    values.len()
                ),
            ));
        }
        for (column, value) in columns.iter().zip(values) {
            self.check_type(column, value)?;
        }
        Ok(key::encode(values))
    }
}
