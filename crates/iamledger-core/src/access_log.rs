//! Append-only, hash-chained access log.
//!
//! Every entry is keyed by a per-ledger sequence number allocated from the
//! table store's counter, so identical entries never overwrite each other.
//! Each stored record carries the hash of its predecessor (zero for the
//! first record), which lets [`AccessLogger::verify`] detect rewritten or
//! removed rows.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::hash::ContentHash;
use crate::table::{Row, TableStore, Value};
use crate::tables::ACCESS_LOG_TABLE;
use crate::tables::columns::{
    DATE_TIME, ENROLL_ID, IS_AUTHORIZED, PREVIOUS_HASH, RESOURCE_IP, RESOURCE_NAME, RESOURCE_URL,
    SEQUENCE, USER_NAME,
};

const ENTRY_HASH_DOMAIN: &str = "iamledger access-log entry v1";

/// One access decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLogEntry {
    /// Resource that was accessed.
    #[serde(rename = "ResourceName")]
    pub resource_name: String,
    /// Resource network address.
    #[serde(rename = "ResourceIP")]
    pub resource_ip: String,
    /// Resource URL.
    #[serde(rename = "ResourceURL")]
    pub resource_url: String,
    /// Subject of the decision.
    #[serde(rename = "UserName")]
    pub user_name: String,
    /// Enrollment identity of the caller.
    #[serde(rename = "EnrollID")]
    pub enroll_id: String,
    /// The decision.
    #[serde(rename = "IsAuthorized")]
    pub is_authorized: bool,
    /// RFC 3339 timestamp of the decision.
    #[serde(rename = "DateTime")]
    pub date_time: String,
}

impl AccessLogEntry {
    fn validate(&self) -> LedgerResult<DateTime<FixedOffset>> {
        for (field, value) in [
            (RESOURCE_NAME, &self.resource_name),
            (RESOURCE_IP, &self.resource_ip),
            (RESOURCE_URL, &self.resource_url),
            (USER_NAME, &self.user_name),
            (ENROLL_ID, &self.enroll_id),
            (DATE_TIME, &self.date_time),
        ] {
            if value.is_empty() {
                return Err(LedgerError::invalid_argument(
                    "recordaccess",
                    format!("{field} must not be empty"),
                ));
            }
        }
        parse_date_time(&self.date_time)
    }
}

fn parse_date_time(value: &str) -> LedgerResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|e| {
        LedgerError::invalid_argument(
            "recordaccess",
            format!("{DATE_TIME} '{value}' is not RFC 3339: {e}"),
        )
    })
}

/// A stored log entry with its chain position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Zero-based insertion sequence number.
    #[serde(rename = "Sequence")]
    pub sequence: u64,
    /// Hash of the preceding record.
    #[serde(rename = "PreviousHash")]
    pub previous_hash: ContentHash,
    /// The recorded decision.
    #[serde(flatten)]
    pub entry: AccessLogEntry,
}

impl LogRecord {
    /// Hash of this record, linked into the next record's `PreviousHash`.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash_with_domain(ENTRY_HASH_DOMAIN, &self.canonical_bytes())
    }

    /// Whether this record directly follows `previous` in the chain.
    #[must_use]
    pub fn follows(&self, previous: &Self) -> bool {
        self.previous_hash == previous.content_hash()
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let e = &self.entry;
        let mut buf = Vec::with_capacity(256);
        buf.extend_from_slice(&self.sequence.to_le_bytes());
        for field in [
            &e.resource_name,
            &e.resource_ip,
            &e.resource_url,
            &e.user_name,
            &e.enroll_id,
            &e.date_time,
        ] {
            let len = u64::try_from(field.len()).unwrap_or(u64::MAX);
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(field.as_bytes());
        }
        buf.push(u8::from(e.is_authorized));
        buf.extend_from_slice(self.previous_hash.as_bytes());
        buf
    }

    fn to_row(&self) -> Row {
        let e = &self.entry;
        Row::new()
            .with(SEQUENCE, self.sequence)
            .with(RESOURCE_NAME, e.resource_name.as_str())
            .with(RESOURCE_IP, e.resource_ip.as_str())
            .with(RESOURCE_URL, e.resource_url.as_str())
            .with(USER_NAME, e.user_name.as_str())
            .with(ENROLL_ID, e.enroll_id.as_str())
            .with(IS_AUTHORIZED, e.is_authorized)
            .with(DATE_TIME, e.date_time.as_str())
            .with(PREVIOUS_HASH, self.previous_hash.as_bytes().to_vec())
    }

    fn from_row(row: &Row) -> LedgerResult<Self> {
        let t = ACCESS_LOG_TABLE;
        let previous = row.bytes(t, PREVIOUS_HASH)?;
        let previous_hash = ContentHash::try_from(previous.as_slice()).map_err(|_| {
            LedgerError::SerializationError(format!(
                "{PREVIOUS_HASH} must be 32 bytes, found {}",
                previous.len()
            ))
        })?;
        Ok(Self {
            sequence: row.uint64(t, SEQUENCE)?,
            previous_hash,
            entry: AccessLogEntry {
                resource_name: row.string(t, RESOURCE_NAME)?,
                resource_ip: row.string(t, RESOURCE_IP)?,
                resource_url: row.string(t, RESOURCE_URL)?,
                user_name: row.string(t, USER_NAME)?,
                enroll_id: row.string(t, ENROLL_ID)?,
                is_authorized: row.boolean(t, IS_AUTHORIZED)?,
                date_time: row.string(t, DATE_TIME)?,
            },
        })
    }
}

/// Result of chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainVerification {
    /// Whether the chain is intact.
    pub valid: bool,
    /// Number of records examined.
    pub entries_verified: u64,
    /// Issues found (empty if valid).
    pub issues: Vec<ChainIssue>,
}

/// A break found during chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainIssue {
    /// The first record does not carry the zero hash.
    InvalidGenesis {
        /// Sequence of the first record.
        sequence: u64,
    },
    /// A record does not link to its predecessor.
    BrokenLink {
        /// Sequence of the record with the bad link.
        sequence: u64,
        /// Hash of the predecessor as stored.
        expected_previous: ContentHash,
        /// Hash the record claims.
        actual_previous: ContentHash,
    },
    /// A sequence number was allocated but no record is stored under it.
    MissingEntry {
        /// The absent sequence number.
        sequence: u64,
    },
}

impl std::fmt::Display for ChainIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGenesis { sequence } => write!(f, "invalid genesis at {sequence}"),
            Self::BrokenLink { sequence, .. } => write!(f, "broken chain link at {sequence}"),
            Self::MissingEntry { sequence } => write!(f, "missing entry {sequence}"),
        }
    }
}

/// Appends to and reads from the access log.
#[derive(Debug, Clone)]
pub struct AccessLogger {
    tables: Arc<TableStore>,
    max_fetch_span: Option<u64>,
}

impl AccessLogger {
    /// Create a logger over an initialized table store.
    #[must_use]
    pub fn new(tables: Arc<TableStore>) -> Self {
        Self {
            tables,
            max_fetch_span: None,
        }
    }

    /// Cap the number of sequence numbers a single fetch may span.
    #[must_use]
    pub fn with_max_fetch_span(mut self, max: Option<u64>) -> Self {
        self.max_fetch_span = max;
        self
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidArgument`] if a field is empty, `DateTime` is
    /// not RFC 3339, or `DateTime` precedes the previous entry's.
    pub fn record(&self, entry: AccessLogEntry) -> LedgerResult<LogRecord> {
        let at = entry.validate()?;

        let previous_hash = match self.last()? {
            Some(previous) => {
                let previous_at = parse_date_time(&previous.entry.date_time)?;
                if at < previous_at {
                    return Err(LedgerError::invalid_argument(
                        "recordaccess",
                        format!(
                            "{DATE_TIME} {} precedes the previous entry ({})",
                            entry.date_time, previous.entry.date_time
                        ),
                    ));
                }
                previous.content_hash()
            },
            None => ContentHash::GENESIS,
        };

        // The row lands under the uncommitted sequence and the counter moves
        // only once it is stored. A row left behind by a failed commit sits
        // past the end of the log and is overwritten here.
        let sequence = self.count()?;
        let next = sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::StorageError("access log sequence overflow".to_owned()))?;
        let record = LogRecord {
            sequence,
            previous_hash,
            entry,
        };
        self.tables.put_row(ACCESS_LOG_TABLE, record.to_row())?;
        self.tables.commit_sequence(ACCESS_LOG_TABLE, next)?;
        debug!(
            sequence,
            user = %record.entry.user_name,
            resource = %record.entry.resource_name,
            authorized = record.entry.is_authorized,
            "recorded access"
        );
        Ok(record)
    }

    /// Records with `from <= Sequence < to`, in insertion order.
    ///
    /// Sequence numbers are zero-based. A range reaching past the end of the
    /// log returns what is available.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidRange`] if `from > to` or the span exceeds the
    /// configured maximum.
    pub fn fetch(&self, from: u64, to: u64) -> LedgerResult<Vec<LogRecord>> {
        if from > to {
            return Err(LedgerError::InvalidRange {
                from,
                to,
                reason: "from must not exceed to".to_owned(),
            });
        }
        if let Some(max) = self.max_fetch_span
            && to.saturating_sub(from) > max
        {
            return Err(LedgerError::InvalidRange {
                from,
                to,
                reason: format!("span exceeds the maximum of {max}"),
            });
        }

        let end = to.min(self.count()?);
        let mut records = Vec::new();
        for sequence in from..end {
            if let Some(row) = self.find(sequence)? {
                records.push(LogRecord::from_row(&row)?);
            }
        }
        Ok(records)
    }

    /// Number of committed records, including any since removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the substrate fails.
    pub fn count(&self) -> LedgerResult<u64> {
        self.tables.current_sequence(ACCESS_LOG_TABLE)
    }

    /// Walk the whole chain and report every break.
    ///
    /// # Errors
    ///
    /// Returns an error if a row cannot be read or decoded.
    pub fn verify(&self) -> LedgerResult<ChainVerification> {
        let count = self.count()?;
        let mut issues = Vec::new();
        let mut entries_verified: u64 = 0;
        let mut previous: Option<LogRecord> = None;

        for sequence in 0..count {
            let Some(row) = self.find(sequence)? else {
                warn!(sequence, "access log entry missing");
                issues.push(ChainIssue::MissingEntry { sequence });
                previous = None;
                continue;
            };
            let record = LogRecord::from_row(&row)?;
            entries_verified = entries_verified.saturating_add(1);

            match &previous {
                None if sequence == 0 && !record.previous_hash.is_genesis() => {
                    warn!(sequence, "access log genesis does not carry the zero hash");
                    issues.push(ChainIssue::InvalidGenesis { sequence });
                },
                Some(prev) if !record.follows(prev) => {
                    warn!(sequence, previous = prev.sequence, "access log chain link broken");
                    issues.push(ChainIssue::BrokenLink {
                        sequence,
                        expected_previous: prev.content_hash(),
                        actual_previous: record.previous_hash,
                    });
                },
                _ => {},
            }
            previous = Some(record);
        }

        let valid = issues.is_empty();
        info!(entries_verified, valid, "verified access log");
        Ok(ChainVerification {
            valid,
            entries_verified,
            issues,
        })
    }

    fn find(&self, sequence: u64) -> LedgerResult<Option<Row>> {
        self.tables
            .find_row(ACCESS_LOG_TABLE, &[Value::Uint64(sequence)])
    }

    /// Newest record actually stored.
    fn last(&self) -> LedgerResult<Option<LogRecord>> {
        for sequence in (0..self.count()?).rev() {
            if let Some(row) = self.find(sequence)? {
                return LogRecord::from_row(&row).map(Some);
            }
            warn!(sequence, "access log entry missing; linking past it");
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::FailingKvStore;
    use crate::tables::access_log_schema;
    use iamledger_storage::{KvStore, MemoryKvStore};

    fn logger() -> (Arc<TableStore>, AccessLogger) {
        let tables = Arc::new(TableStore::new(Arc::new(MemoryKvStore::new())));
        tables.create_table(access_log_schema()).unwrap();
        (Arc::clone(&tables), AccessLogger::new(tables))
    }

    fn entry(user: &str, at: &str) -> AccessLogEntry {
        AccessLogEntry {
            resource_name: "srv1".to_owned(),
            resource_ip: "10.0.0.1".to_owned(),
            resource_url: "/api".to_owned(),
            user_name: user.to_owned(),
            enroll_id: "enroll-1".to_owned(),
            is_authorized: true,
            date_time: at.to_owned(),
        }
    }

    #[test]
    fn test_identical_entries_are_appended() {
        let (_, logger) = logger();
        let first = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();
        let second = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();

        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert!(first.previous_hash.is_genesis());
        assert!(second.follows(&first));
        assert_eq!(logger.count().unwrap(), 2);
    }

    #[test]
    fn test_fetch_range() {
        let (_, logger) = logger();
        for minute in 0..5 {
            let at = format!("2024-01-01T00:0{minute}:00Z");
            logger.record(entry("alice", &at)).unwrap();
        }

        let middle: Vec<u64> = logger
            .fetch(1, 3)
            .unwrap()
            .iter()
            .map(|r| r.sequence)
            .collect();
        assert_eq!(middle, vec![1, 2]);
        assert_eq!(logger.fetch(0, 10).unwrap().len(), 5);
        assert!(logger.fetch(2, 2).unwrap().is_empty());
        assert!(logger.fetch(7, 10).unwrap().is_empty());
        assert!(matches!(
            logger.fetch(3, 1),
            Err(LedgerError::InvalidRange { from: 3, to: 1, .. })
        ));
    }

    #[test]
    fn test_fetch_span_limit() {
        let (tables, _) = logger();
        let logger = AccessLogger::new(tables).with_max_fetch_span(Some(2));
        assert!(logger.fetch(0, 2).is_ok());
        assert!(matches!(
            logger.fetch(0, 3),
            Err(LedgerError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_record_rejects_bad_input() {
        let (_, logger) = logger();
        let mut missing = entry("alice", "2024-01-01T00:00:00Z");
        missing.enroll_id.clear();
        assert!(matches!(
            logger.record(missing),
            Err(LedgerError::InvalidArgument { message, .. }) if message.contains("EnrollID")
        ));
        assert!(matches!(
            logger.record(entry("alice", "yesterday")),
            Err(LedgerError::InvalidArgument { .. })
        ));
        assert_eq!(logger.count().unwrap(), 0);
    }

    #[test]
    fn test_record_rejects_time_going_backwards() {
        let (_, logger) = logger();
        logger.record(entry("alice", "2024-01-01T12:00:00Z")).unwrap();
        assert!(matches!(
            logger.record(entry("bob", "2024-01-01T11:59:59Z")),
            Err(LedgerError::InvalidArgument { .. })
        ));
        // Same instant in another offset is not earlier.
        logger.record(entry("bob", "2024-01-01T13:00:00+01:00")).unwrap();
        assert_eq!(logger.count().unwrap(), 2);
    }

    #[test]
    fn test_verify_intact_chain() {
        let (_, logger) = logger();
        assert!(logger.verify().unwrap().valid);
        for user in ["alice", "bob", "carol"] {
            logger.record(entry(user, "2024-01-01T00:00:00Z")).unwrap();
        }
        let result = logger.verify().unwrap();
        assert!(result.valid);
        assert_eq!(result.entries_verified, 3);
    }

    #[test]
    fn test_verify_detects_tampering() {
        let (tables, logger) = logger();
        for user in ["alice", "bob", "carol"] {
            logger.record(entry(user, "2024-01-01T00:00:00Z")).unwrap();
        }

        let mut forged = logger.fetch(1, 2).unwrap().remove(0);
        forged.entry.is_authorized = false;
        tables.put_row(ACCESS_LOG_TABLE, forged.to_row()).unwrap();

        let result = logger.verify().unwrap();
        assert!(!result.valid);
        assert!(matches!(
            result.issues.as_slice(),
            [ChainIssue::BrokenLink { sequence: 2, .. }]
        ));
    }

    #[test]
    fn test_verify_detects_removed_entry() {
        let (tables, logger) = logger();
        for user in ["alice", "bob", "carol"] {
            logger.record(entry(user, "2024-01-01T00:00:00Z")).unwrap();
        }
        tables
            .delete_row(ACCESS_LOG_TABLE, &[Value::Uint64(1)])
            .unwrap();

        let result = logger.verify().unwrap();
        assert_eq!(result.entries_verified, 2);
        assert_eq!(result.issues, vec![ChainIssue::MissingEntry { sequence: 1 }]);
    }

    #[test]
    fn test_verify_detects_bad_genesis() {
        let (tables, logger) = logger();
        let mut record = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();
        record.previous_hash = ContentHash::hash_with_domain("test", b"x");
        tables.put_row(ACCESS_LOG_TABLE, record.to_row()).unwrap();

        let result = logger.verify().unwrap();
        assert_eq!(result.issues, vec![ChainIssue::InvalidGenesis { sequence: 0 }]);
    }

    fn failing_logger() -> (Arc<FailingKvStore>, AccessLogger) {
        let kv = Arc::new(FailingKvStore::new());
        let tables = Arc::new(TableStore::new(Arc::clone(&kv) as Arc<dyn KvStore>));
        tables.create_table(access_log_schema()).unwrap();
        (kv, AccessLogger::new(tables))
    }

    #[test]
    fn test_failed_row_write_allocates_no_sequence() {
        let (kv, logger) = failing_logger();
        let first = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();

        kv.break_writes("table:AccessLogTable");
        assert!(matches!(
            logger.record(entry("bob", "2024-01-01T00:01:00Z")),
            Err(LedgerError::StorageError(_))
        ));
        kv.heal();
        assert_eq!(logger.count().unwrap(), 1);

        let next = logger.record(entry("carol", "2024-01-01T00:02:00Z")).unwrap();
        assert_eq!(next.sequence, 1);
        assert!(next.follows(&first));
        // Ordering is still checked against the stored predecessor.
        assert!(logger.record(entry("dave", "2023-12-31T00:00:00Z")).is_err());

        let result = logger.verify().unwrap();
        assert!(result.valid, "{:?}", result.issues);
        assert_eq!(result.entries_verified, 2);
    }

    #[test]
    fn test_failed_sequence_commit_is_overwritten() {
        let (kv, logger) = failing_logger();
        let first = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();

        kv.break_writes("sequence");
        assert!(logger.record(entry("bob", "2024-01-01T00:01:00Z")).is_err());
        kv.heal();

        // The row written before the failed commit is past the end of the log.
        assert_eq!(logger.fetch(0, 10).unwrap(), vec![first.clone()]);
        let next = logger.record(entry("carol", "2024-01-01T00:02:00Z")).unwrap();
        assert_eq!(next.sequence, 1);
        assert_eq!(next.entry.user_name, "carol");
        assert!(next.follows(&first));
        assert!(logger.verify().unwrap().valid);
    }

    #[test]
    fn test_record_links_past_a_removed_tail() {
        let (tables, logger) = logger();
        let first = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();
        logger.record(entry("bob", "2024-01-01T00:01:00Z")).unwrap();
        tables
            .delete_row(ACCESS_LOG_TABLE, &[Value::Uint64(1)])
            .unwrap();

        let next = logger.record(entry("carol", "2024-01-01T00:02:00Z")).unwrap();
        assert_eq!(next.sequence, 2);
        assert!(next.follows(&first));
        assert!(!next.previous_hash.is_genesis());
    }

    #[test]
    fn test_record_payload_shape() {
        let (_, logger) = logger();
        let record = logger.record(entry("alice", "2024-01-01T00:00:00Z")).unwrap();
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Sequence"], 0);
        assert_eq!(json["UserName"], "alice");
        assert_eq!(json["IsAuthorized"], true);
        assert_eq!(json["PreviousHash"], "0".repeat(64));
    }
}
