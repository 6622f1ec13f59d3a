//! Typed tables over the raw key-value substrate.
//!
//! [`TableStore`] enforces schema-on-write: every row is checked against its
//! table's declared columns before it reaches the [`KvStore`], and checked
//! again when read back. Rows are addressed by their composite key (the
//! ordered tuple of key columns); unique columns get a secondary index so
//! rows can also be found by that value. The row is authoritative: an index
//! entry whose row is gone or no longer holds the value is ignored.
//!
//! # Substrate layout
//!
//! | Namespace | Key | Value |
//! |-----------|-----|-------|
//! | `schema` | table name | JSON [`TableSchema`] |
//! | `table:{name}` | encoded composite key | JSON [`Row`] |
//! | `index:{name}:{column}` | encoded column value | composite key |
//! | `sequence` | table name | next sequence number (decimal) |

mod key;
mod schema;
mod value;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use iamledger_storage::{KvEntry, KvStore};
use tracing::{debug, info, warn};

use crate::bridge::block_on;
use crate::error::{LedgerError, LedgerResult};

pub use schema::{ColumnDef, TableSchema};
pub use value::{ColumnType, Row, Value};

const NS_SCHEMA: &str = "schema";
const NS_SEQUENCE: &str = "sequence";

fn rows_ns(table: &str) -> String {
    format!("table:{table}")
}

fn index_ns(table: &str, column: &str) -> String {
    format!("index:{table}:{column}")
}

/// Column equality filter for [`TableStore::scan_rows`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    column: String,
    value: Value,
}

impl Predicate {
    /// Match rows whose `column` equals `value`.
    #[must_use]
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    fn matches(&self, row: &Row) -> bool {
        row.get(&self.column) == Some(&self.value)
    }
}

/// Typed table layer over a [`KvStore`].
pub struct TableStore {
    kv: Arc<dyn KvStore>,
    /// Schemas are immutable once created, so caching them is safe.
    schemas: RwLock<HashMap<String, Arc<TableSchema>>>,
}

impl TableStore {
    /// Wrap a substrate.
    #[must_use]
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self {
            kv,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    /// Declare a table.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidSchema`] if the schema is malformed,
    /// [`LedgerError::SchemaExists`] if the table was already created.
    pub fn create_table(&self, schema: TableSchema) -> LedgerResult<()> {
        schema.validate()?;
        if self.table_exists(&schema.name)? {
            return Err(LedgerError::SchemaExists {
                table: schema.name,
            });
        }

        let bytes = serde_json::to_vec(&schema)?;
        block_on(self.kv.set(NS_SCHEMA, &schema.name, bytes))?;
        info!(
            table = %schema.name,
            columns = schema.columns.len(),
            "created table"
        );

        self.schemas
            .write()
            .map_err(|e| LedgerError::StorageError(e.to_string()))?
            .insert(schema.name.clone(), Arc::new(schema));
        Ok(())
    }

    /// Whether a table has been created.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate fails.
    pub fn table_exists(&self, table: &str) -> LedgerResult<bool> {
        if self
            .schemas
            .read()
            .map_err(|e| LedgerError::StorageError(e.to_string()))?
            .contains_key(table)
        {
            return Ok(true);
        }
        block_on(self.kv.exists(NS_SCHEMA, table))
    }

    /// Get a table's schema.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownTable`] if the table was never created.
    pub fn schema(&self, table: &str) -> LedgerResult<Arc<TableSchema>> {
        {
            let cache = self
                .schemas
                .read()
                .map_err(|e| LedgerError::StorageError(e.to_string()))?;
            if let Some(schema) = cache.get(table) {
                return Ok(Arc::clone(schema));
            }
        }

        let bytes = block_on(self.kv.get(NS_SCHEMA, table))?.ok_or_else(|| {
            LedgerError::UnknownTable {
                table: table.to_owned(),
            }
        })?;
        let schema: Arc<TableSchema> = Arc::new(serde_json::from_slice(&bytes)?);
        self.schemas
            .write()
            .map_err(|e| LedgerError::StorageError(e.to_string()))?
            .insert(table.to_owned(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Write a row, overwriting any row at the same composite key.
    ///
    /// Returns the encoded composite key.
    ///
    /// # Errors
    ///
    /// [`LedgerError::TypeMismatch`], [`LedgerError::MissingColumn`],
    /// [`LedgerError::UnknownColumn`], or [`LedgerError::DuplicateKey`] if a
    /// unique value belongs to another row.
    pub fn put_row(&self, table: &str, row: Row) -> LedgerResult<String> {
        self.write(table, row, true)
    }

    /// Write a row that must not exist yet.
    ///
    /// # Errors
    ///
    /// As [`put_row`](Self::put_row), plus [`LedgerError::DuplicateKey`] if
    /// a row already lives at the composite key.
    pub fn insert_row(&self, table: &str, row: Row) -> LedgerResult<String> {
        self.write(table, row, false)
    }

    fn write(&self, table: &str, row: Row, overwrite: bool) -> LedgerResult<String> {
        let schema = self.schema(table)?;
        schema.validate_row(&row)?;
        let row_key = schema.row_key(&row)?;

        let existing = self.load(&schema, &row_key)?;
        if existing.is_some() && !overwrite {
            return Err(LedgerError::DuplicateKey {
                table: table.to_owned(),
                key: row_key,
            });
        }

        for column in schema.unique_columns() {
            let Some(value) = row.get(&column.name) else {
                continue;
            };
            if let Some(holder) = self.index_holder(&schema, &column.name, value)?
                && holder != row_key
            {
                return Err(LedgerError::DuplicateKey {
                    table: table.to_owned(),
                    key: format!("{}={value}", column.name),
                });
            }
        }

        // Indexes before the row. An entry only counts once its row holds the
        // value.
        for column in schema.unique_columns() {
            if let Some(new) = row.get(&column.name) {
                let ns = index_ns(table, &column.name);
                let index_key = key::encode_component(new);
                block_on(self.kv.set(&ns, &index_key, row_key.clone().into_bytes()))?;
            }
        }

        let bytes = serde_json::to_vec(&row)?;
        block_on(self.kv.set(&rows_ns(table), &row_key, bytes))?;

        for column in schema.unique_columns() {
            let old = existing.as_ref().and_then(|r| r.get(&column.name));
            if let Some(old) = old
                && Some(old) != row.get(&column.name)
            {
                let ns = index_ns(table, &column.name);
                self.drop_index_entry(&ns, old);
            }
        }

        debug!(table, key = %row_key, overwrite, "wrote row");
        Ok(row_key)
    }

    /// Read a row by composite key (values in key-column order).
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if absent.
    pub fn get_row(&self, table: &str, key: &[Value]) -> LedgerResult<Row> {
        let schema = self.schema(table)?;
        let row_key = schema.encode_key(key)?;
        self.load(&schema, &row_key)?
            .ok_or(LedgerError::NotFound {
                table: table.to_owned(),
                key: row_key,
            })
    }

    /// Read a row by composite key, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or the substrate fails.
    pub fn find_row(&self, table: &str, key: &[Value]) -> LedgerResult<Option<Row>> {
        let schema = self.schema(table)?;
        let row_key = schema.encode_key(key)?;
        self.load(&schema, &row_key)
    }

    /// Read a row through a unique column.
    ///
    /// # Errors
    ///
    /// [`LedgerError::NotFound`] if no live row holds `value`;
    /// [`LedgerError::InvalidArgument`] if `column` is not unique.
    pub fn get_row_by(&self, table: &str, column: &str, value: &Value) -> LedgerResult<Row> {
        self.find_row_by(table, column, value)?
            .ok_or_else(|| LedgerError::NotFound {
                table: table.to_owned(),
                key: format!("{column}={value}"),
            })
    }

    /// Read a row through a unique column, `None` if absent.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `column` is not unique.
    pub fn find_row_by(&self, table: &str, column: &str, value: &Value) -> LedgerResult<Option<Row>> {
        let schema = self.schema(table)?;
        self.check_lookup(&schema, column, value)?;
        match self.index_holder(&schema, column, value)? {
            Some(row_key) => self.load(&schema, &row_key),
            None => Ok(None),
        }
    }

    /// Delete a row by composite key. Deleting an absent row succeeds.
    ///
    /// Returns whether a row existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is malformed or the substrate fails.
    pub fn delete_row(&self, table: &str, key: &[Value]) -> LedgerResult<bool> {
        let schema = self.schema(table)?;
        let row_key = schema.encode_key(key)?;
        self.delete_encoded(&schema, &row_key)
    }

    /// Delete the row holding `value` in a unique column. Idempotent.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if `column` is not unique.
    pub fn delete_row_by(&self, table: &str, column: &str, value: &Value) -> LedgerResult<bool> {
        let schema = self.schema(table)?;
        self.check_lookup(&schema, column, value)?;
        match self.index_holder(&schema, column, value)? {
            Some(row_key) => self.delete_encoded(&schema, &row_key),
            None => {
                debug!(table, column, %value, "delete of absent row");
                Ok(false)
            },
        }
    }

    /// Iterate rows in composite-key order, optionally filtered.
    ///
    /// The table's raw entries are read eagerly into one snapshot when the
    /// scan starts; only decoding and filtering happen as the iterator is
    /// consumed. The scan can be consumed once.
    ///
    /// # Errors
    ///
    /// [`LedgerError::UnknownColumn`] if the predicate names an undeclared
    /// column.
    pub fn scan_rows(&self, table: &str, predicate: Option<Predicate>) -> LedgerResult<RowScan> {
        let schema = self.schema(table)?;
        if let Some(p) = &predicate
            && schema.column(&p.column).is_none()
        {
            return Err(LedgerError::UnknownColumn {
                table: table.to_owned(),
                column: p.column.clone(),
            });
        }
        let entries = block_on(self.kv.scan(&rows_ns(table)))?;
        Ok(RowScan {
            schema,
            entries: entries.into_iter(),
            predicate,
        })
    }

    /// Move a per-table counter to `next`.
    ///
    /// Callers write the row for the current value first and commit the
    /// counter afterwards, so a failed row write allocates nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate fails.
    pub fn commit_sequence(&self, table: &str, next: u64) -> LedgerResult<()> {
        block_on(
            self.kv
                .set(NS_SEQUENCE, table, next.to_string().into_bytes()),
        )?;
        Ok(())
    }

    /// Number of sequence values committed so far, starting at zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter is corrupt or the substrate fails.
    pub fn current_sequence(&self, table: &str) -> LedgerResult<u64> {
        match block_on(self.kv.get(NS_SEQUENCE, table))? {
            None => Ok(0),
            Some(bytes) => std::str::from_utf8(&bytes)
                .ok()
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| LedgerError::SerializationError(format!("corrupt sequence for {table}"))),
        }
    }

    fn load(&self, schema: &TableSchema, row_key: &str) -> LedgerResult<Option<Row>> {
        block_on(self.kv.get(&rows_ns(&schema.name), row_key))?
            .map(|bytes| decode_row(schema, &bytes))
            .transpose()
    }

    fn check_lookup(&self, schema: &TableSchema, column: &str, value: &Value) -> LedgerResult<()> {
        let def = schema.column(column).ok_or_else(|| LedgerError::UnknownColumn {
            table: schema.name.clone(),
            column: column.to_owned(),
        })?;
        if !def.unique {
            return Err(LedgerError::invalid_argument(
                format!("{} lookup", schema.name),
                format!("column '{column}' is not a unique column"),
            ));
        }
        if value.column_type() != def.column_type {
            return Err(LedgerError::TypeMismatch {
                table: schema.name.clone(),
                column: column.to_owned(),
                expected: def.column_type,
                found: value.column_type(),
            });
        }
        Ok(())
    }

    /// Row key holding `value` in a unique column.
    ///
    /// An index entry counts only while its row exists and still carries the
    /// value; anything else is left over from an interrupted write.
    fn index_holder(
        &self,
        schema: &TableSchema,
        column: &str,
        value: &Value,
    ) -> LedgerResult<Option<String>> {
        let ns = index_ns(&schema.name, column);
        let Some(bytes) = block_on(self.kv.get(&ns, &key::encode_component(value)))? else {
            return Ok(None);
        };
        let row_key =
            String::from_utf8(bytes).map_err(|e| LedgerError::SerializationError(e.to_string()))?;
        let live = self
            .load(schema, &row_key)?
            .is_some_and(|row| row.get(column) == Some(value));
        if !live {
            debug!(table = %schema.name, column, %value, "ignoring stale index entry");
        }
        Ok(live.then_some(row_key))
    }

    /// Remove an index entry whose row no longer holds the value. A failure
    /// only leaves a stale entry, which lookups already ignore.
    fn drop_index_entry(&self, ns: &str, value: &Value) {
        if let Err(e) = block_on(self.kv.delete(ns, &key::encode_component(value))) {
            warn!(namespace = ns, %value, error = %e, "failed to drop stale index entry");
        }
    }

    fn delete_encoded(&self, schema: &TableSchema, row_key: &str) -> LedgerResult<bool> {
        let Some(existing) = self.load(schema, row_key)? else {
            debug!(table = %schema.name, key = %row_key, "delete of absent row");
            return Ok(false);
        };

        block_on(self.kv.delete(&rows_ns(&schema.name), row_key))?;
        for column in schema.unique_columns() {
            let Some(value) = existing.get(&column.name) else {
                continue;
            };
            let ns = index_ns(&schema.name, &column.name);
            if block_on(self.kv.get(&ns, &key::encode_component(value)))?.as_deref()
                == Some(row_key.as_bytes())
            {
                self.drop_index_entry(&ns, value);
            }
        }

        debug!(table = %schema.name, key = %row_key, "deleted row");
        Ok(true)
    }
}

impl std::fmt::Debug for TableStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableStore").finish_non_exhaustive()
    }
}

fn decode_row(schema: &TableSchema, bytes: &[u8]) -> LedgerResult<Row> {
    let row: Row = serde_json::from_slice(bytes)?;
    schema.validate_row(&row)?;
    Ok(row)
}

/// Single-pass iterator returned by [`TableStore::scan_rows`].
pub struct RowScan {
    schema: Arc<TableSchema>,
    entries: std::vec::IntoIter<KvEntry>,
    predicate: Option<Predicate>,
}

impl Iterator for RowScan {
    type Item = LedgerResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            match decode_row(&self.schema, &entry.value) {
                Ok(row) if self.predicate.as_ref().is_none_or(|p| p.matches(&row)) => {
                    return Some(Ok(row));
                },
                Ok(_) => {},
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

impl std::fmt::Debug for RowScan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowScan")
            .field("table", &self.schema.name)
            .field("remaining", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FailingKvStore;
    use iamledger_storage::MemoryKvStore;

    fn accounts_schema() -> TableSchema {
        TableSchema::new(
            "Accounts",
            vec![
                ColumnDef::key("Owner", ColumnType::String),
                ColumnDef::key("Active", ColumnType::Bool),
                ColumnDef::required("Handle", ColumnType::String).unique(),
                ColumnDef::optional("Avatar", ColumnType::Bytes),
            ],
        )
    }

    fn store() -> TableStore {
        let store = TableStore::new(Arc::new(MemoryKvStore::new()));
        store.create_table(accounts_schema()).unwrap();
        store
    }

    fn account(owner: &str, active: bool, handle: &str) -> Row {
        Row::new()
            .with("Owner", owner)
            .with("Active", active)
            .with("Handle", handle)
    }

    #[test]
    fn test_create_table_twice_fails() {
        let store = store();
        assert!(matches!(
            store.create_table(accounts_schema()),
            Err(LedgerError::SchemaExists { .. })
        ));
    }

    #[test]
    fn test_schema_survives_a_fresh_store() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        TableStore::new(Arc::clone(&kv))
            .create_table(accounts_schema())
            .unwrap();

        let reopened = TableStore::new(kv);
        assert!(reopened.table_exists("Accounts").unwrap());
        assert_eq!(*reopened.schema("Accounts").unwrap(), accounts_schema());
        assert!(matches!(
            reopened.schema("Nope"),
            Err(LedgerError::UnknownTable { .. })
        ));
    }

    #[test]
    fn test_put_get_delete() {
        let store = store();
        let row = account("alice", true, "@alice").with("Avatar", vec![1u8, 2, 3]);
        store.put_row("Accounts", row.clone()).unwrap();

        let key = [Value::from("alice"), Value::from(true)];
        assert_eq!(store.get_row("Accounts", &key).unwrap(), row);

        assert!(store.delete_row("Accounts", &key).unwrap());
        assert!(!store.delete_row("Accounts", &key).unwrap());
        assert!(matches!(
            store.get_row("Accounts", &key),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_put_rejects_wrong_type() {
        let store = store();
        let row = account("alice", true, "@alice").with("Avatar", "not-bytes");
        assert!(matches!(
            store.put_row("Accounts", row),
            Err(LedgerError::TypeMismatch { column, .. }) if column == "Avatar"
        ));
        assert_eq!(store.scan_rows("Accounts", None).unwrap().count(), 0);
    }

    #[test]
    fn test_insert_rejects_existing_key() {
        let store = store();
        store.insert_row("Accounts", account("alice", true, "@a")).unwrap();
        assert!(matches!(
            store.insert_row("Accounts", account("alice", true, "@b")),
            Err(LedgerError::DuplicateKey { .. })
        ));
        // put_row overwrites, and the unique index follows the new value.
        store.put_row("Accounts", account("alice", true, "@b")).unwrap();
        assert!(store
            .find_row_by("Accounts", "Handle", &Value::from("@a"))
            .unwrap()
            .is_none());
        assert!(store
            .find_row_by("Accounts", "Handle", &Value::from("@b"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_unique_column_conflict() {
        let store = store();
        store.insert_row("Accounts", account("alice", true, "@shared")).unwrap();
        let err = store
            .insert_row("Accounts", account("bob", true, "@shared"))
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateKey { key, .. } if key == "Handle=@shared"));

        assert!(store
            .delete_row_by("Accounts", "Handle", &Value::from("@shared"))
            .unwrap());
        store.insert_row("Accounts", account("bob", true, "@shared")).unwrap();
    }

    #[test]
    fn test_lookup_requires_unique_column() {
        let store = store();
        assert!(matches!(
            store.get_row_by("Accounts", "Avatar", &Value::Bytes(vec![1])),
            Err(LedgerError::InvalidArgument { .. })
        ));
        assert!(matches!(
            store.get_row_by("Accounts", "Handle", &Value::from("@ghost")),
            Err(LedgerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_scan_with_predicate() {
        let store = store();
        store.put_row("Accounts", account("carol", false, "@c")).unwrap();
        store.put_row("Accounts", account("alice", true, "@a")).unwrap();
        store.put_row("Accounts", account("bob", true, "@b")).unwrap();

        let owners: Vec<String> = store
            .scan_rows("Accounts", Some(Predicate::equals("Active", true)))
            .unwrap()
            .map(|r| r.unwrap().string("Accounts", "Owner").unwrap())
            .collect();
        assert_eq!(owners, vec!["alice", "bob"]);

        assert!(matches!(
            store.scan_rows("Accounts", Some(Predicate::equals("Nope", true))),
            Err(LedgerError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_sequence_moves_only_on_commit() {
        let store = store();
        assert_eq!(store.current_sequence("Accounts").unwrap(), 0);
        store.commit_sequence("Accounts", 1).unwrap();
        store.commit_sequence("Accounts", 2).unwrap();
        assert_eq!(store.current_sequence("Accounts").unwrap(), 2);
    }

    #[test]
    fn test_unique_key_column_spans_wider_keys() {
        let store = TableStore::new(Arc::new(MemoryKvStore::new()));
        store
            .create_table(TableSchema::new(
                "Grants",
                vec![
                    ColumnDef::key("Owner", ColumnType::String),
                    ColumnDef::key("Name", ColumnType::String).unique(),
                ],
            ))
            .unwrap();
        let grant = |owner: &str, name: &str| Row::new().with("Owner", owner).with("Name", name);

        store.insert_row("Grants", grant("alice", "g1")).unwrap();
        store.insert_row("Grants", grant("alice", "g2")).unwrap();
        assert!(matches!(
            store.insert_row("Grants", grant("bob", "g1")),
            Err(LedgerError::DuplicateKey { key, .. }) if key == "Name=g1"
        ));

        let found = store
            .get_row_by("Grants", "Name", &Value::from("g2"))
            .unwrap();
        assert_eq!(found, grant("alice", "g2"));
        assert!(store
            .delete_row_by("Grants", "Name", &Value::from("g1"))
            .unwrap());
        store.insert_row("Grants", grant("bob", "g1")).unwrap();
    }

    #[test]
    fn test_failed_row_write_leaves_nothing_visible() {
        let kv = Arc::new(FailingKvStore::new());
        let store = TableStore::new(Arc::clone(&kv) as Arc<dyn KvStore>);
        store.create_table(accounts_schema()).unwrap();

        kv.break_writes(&rows_ns("Accounts"));
        assert!(matches!(
            store.insert_row("Accounts", account("alice", true, "@a")),
            Err(LedgerError::StorageError(_))
        ));
        kv.heal();

        // The index entry written ahead of the row is not trusted.
        assert!(store
            .find_row_by("Accounts", "Handle", &Value::from("@a"))
            .unwrap()
            .is_none());
        store.insert_row("Accounts", account("bob", true, "@a")).unwrap();
        assert_eq!(
            store
                .get_row_by("Accounts", "Handle", &Value::from("@a"))
                .unwrap()
                .string("Accounts", "Owner")
                .unwrap(),
            "bob"
        );
    }

    #[test]
    fn test_failed_index_write_keeps_old_row() {
        let kv = Arc::new(FailingKvStore::new());
        let store = TableStore::new(Arc::clone(&kv) as Arc<dyn KvStore>);
        store.create_table(accounts_schema()).unwrap();
        store.put_row("Accounts", account("alice", true, "@old")).unwrap();

        kv.break_writes(&index_ns("Accounts", "Handle"));
        assert!(store.put_row("Accounts", account("alice", true, "@new")).is_err());
        kv.heal();

        let key = [Value::from("alice"), Value::from(true)];
        assert_eq!(
            store.get_row("Accounts", &key).unwrap(),
            account("alice", true, "@old")
        );
        assert!(store
            .find_row_by("Accounts", "Handle", &Value::from("@old"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_unremoved_old_index_entry_is_ignored() {
        let kv = Arc::new(FailingKvStore::new());
        let store = TableStore::new(Arc::clone(&kv) as Arc<dyn KvStore>);
        store.create_table(accounts_schema()).unwrap();
        store.put_row("Accounts", account("alice", true, "@old")).unwrap();

        kv.break_deletes(&index_ns("Accounts", "Handle"));
        store.put_row("Accounts", account("alice", true, "@new")).unwrap();
        assert!(store
            .find_row_by("Accounts", "Handle", &Value::from("@old"))
            .unwrap()
            .is_none());
        store.insert_row("Accounts", account("bob", true, "@old")).unwrap();
    }

    #[tokio::test]
    async fn test_usable_inside_a_runtime() {
        let store = store();
        store.put_row("Accounts", account("dave", true, "@d")).unwrap();
        assert!(store
            .find_row("Accounts", &[Value::from("dave"), Value::from(true)])
            .unwrap()
            .is_some());
    }
}
