//! Column values and rows.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// UTF-8 text.
    String,
    /// Boolean.
    Bool,
    /// Opaque bytes.
    Bytes,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Bytes => "bytes",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
        };
        f.write_str(name)
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Boolean.
    Bool(bool),
    /// Opaque bytes, hex-encoded when serialized.
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    Uint64(u64),
}

impl Value {
    /// The type of this value.
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::String(_) => ColumnType::String,
            Self::Bool(_) => ColumnType::Bool,
            Self::Bytes(_) => ColumnType::Bytes,
            Self::Int64(_) => ColumnType::Int64,
            Self::Uint64(_) => ColumnType::Uint64,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Bytes(b) => f.write_str(&hex::encode(b)),
            Self::Int64(n) => write!(f, "{n}"),
            Self::Uint64(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Uint64(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int64(n)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// A row: column name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(column.into(), value.into());
        self
    }

    /// Set a column, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(column.into(), value.into())
    }

    /// Get a column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Iterate over `(column, value)` pairs in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of columns set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no column is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn require(&self, table: &str, column: &str) -> LedgerResult<&Value> {
        self.0.get(column).ok_or_else(|| LedgerError::MissingColumn {
            table: table.to_owned(),
            column: column.to_owned(),
        })
    }

    /// Read a required `string` column.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MissingColumn`] or [`LedgerError::TypeMismatch`].
    pub fn string(&self, table: &str, column: &str) -> LedgerResult<String> {
        match self.require(table, column)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch(table, column, ColumnType::String, other)),
        }
    }

    /// Read a required `bool` column.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MissingColumn`] or [`LedgerError::TypeMismatch`].
    pub fn boolean(&self, table: &str, column: &str) -> LedgerResult<bool> {
        match self.require(table, column)? {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch(table, column, ColumnType::Bool, other)),
        }
    }

    /// Read a required `bytes` column.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MissingColumn`] or [`LedgerError::TypeMismatch`].
    pub fn bytes(&self, table: &str, column: &str) -> LedgerResult<Vec<u8>> {
        match self.require(table, column)? {
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(mismatch(table, column, ColumnType::Bytes, other)),
        }
    }

    /// Read a required `uint64` column.
    ///
    /// # Errors
    ///
    /// [`LedgerError::MissingColumn`] or [`LedgerError::TypeMismatch`].
    pub fn uint64(&self, table: &str, column: &str) -> LedgerResult<u64> {
        match self.require(table, column)? {
            Value::Uint64(n) => Ok(*n),
            other => Err(mismatch(table, column, ColumnType::Uint64, other)),
        }
    }
}

fn mismatch(table: &str, column: &str, expected: ColumnType, found: &Value) -> LedgerError {
    LedgerError::TypeMismatch {
        table: table.to_owned(),
        column: column.to_owned(),
        expected,
        found: found.column_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_serialization_is_tagged() {
        let json = serde_json::to_string(&Value::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(json, r#"{"type":"bytes","value":"dead"}"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Bytes(vec![0xde, 0xad]));
    }

    #[test]
    fn test_typed_accessors() {
        let row = Row::new()
            .with("UserName", "alice")
            .with("IsAuthorized", true)
            .with("Sequence", 7u64);

        assert_eq!(row.string("T", "UserName").unwrap(), "alice");
        assert!(row.boolean("T", "IsAuthorized").unwrap());
        assert_eq!(row.uint64("T", "Sequence").unwrap(), 7);
        assert!(matches!(
            row.boolean("T", "UserName"),
            Err(LedgerError::TypeMismatch { expected: ColumnType::Bool, found: ColumnType::String, .. })
        ));
        assert!(matches!(
            row.string("T", "EnrollID"),
            Err(LedgerError::MissingColumn { .. })
        ));
    }
}
