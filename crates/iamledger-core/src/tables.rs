//! Ledger table definitions.

use crate::table::{ColumnDef, ColumnType, TableSchema};

/// Policy table, keyed by `(UserName, IsAuthorized, PolicyName)`.
pub const IA_MANAGER_TABLE: &str = "IAManagerTable";
/// Append-only access log, keyed by `Sequence`.
pub const ACCESS_LOG_TABLE: &str = "AccessLogTable";
/// Protected resources, keyed by `ResourceName`.
pub const RESOURCE_TABLE: &str = "ResourceTable";

/// Column names shared by the ledger tables.
pub mod columns {
    /// Owner of a policy or subject of a log entry.
    pub const USER_NAME: &str = "UserName";
    /// Grant (`true`) or deny (`false`).
    pub const IS_AUTHORIZED: &str = "IsAuthorized";
    /// Unique policy name.
    pub const POLICY_NAME: &str = "PolicyName";
    /// Resource name.
    pub const RESOURCE_NAME: &str = "ResourceName";
    /// Resource network address.
    pub const RESOURCE_IP: &str = "ResourceIP";
    /// Resource URL.
    pub const RESOURCE_URL: &str = "ResourceURL";
    /// Opaque user type.
    pub const USER_TYPE: &str = "UserType";
    /// Opaque user role.
    pub const USER_ROLE: &str = "UserRole";
    /// Enrollment identity of the caller.
    pub const ENROLL_ID: &str = "EnrollID";
    /// RFC 3339 timestamp.
    pub const DATE_TIME: &str = "DateTime";
    /// Log sequence number.
    pub const SEQUENCE: &str = "Sequence";
    /// Hash of the preceding log entry.
    pub const PREVIOUS_HASH: &str = "PreviousHash";
}

use columns::{
    DATE_TIME, ENROLL_ID, IS_AUTHORIZED, POLICY_NAME, PREVIOUS_HASH, RESOURCE_IP, RESOURCE_NAME,
    RESOURCE_URL, SEQUENCE, USER_NAME, USER_ROLE, USER_TYPE,
};

/// Schema of [`IA_MANAGER_TABLE`].
#[must_use]
pub fn ia_manager_schema() -> TableSchema {
    TableSchema::new(
        IA_MANAGER_TABLE,
        vec![
            ColumnDef::key(USER_NAME, ColumnType::String),
            ColumnDef::key(IS_AUTHORIZED, ColumnType::Bool),
            ColumnDef::key(POLICY_NAME, ColumnType::String).unique(),
            ColumnDef::optional(RESOURCE_NAME, ColumnType::String),
            ColumnDef::optional(RESOURCE_IP, ColumnType::String),
            ColumnDef::required(RESOURCE_URL, ColumnType::String),
            ColumnDef::optional(USER_TYPE, ColumnType::Bytes),
            ColumnDef::optional(USER_ROLE, ColumnType::Bytes),
            ColumnDef::optional(ENROLL_ID, ColumnType::String),
        ],
    )
}

/// Schema of [`ACCESS_LOG_TABLE`].
#[must_use]
pub fn access_log_schema() -> TableSchema {
    TableSchema::new(
        ACCESS_LOG_TABLE,
        vec![
            ColumnDef::key(SEQUENCE, ColumnType::Uint64),
            ColumnDef::required(RESOURCE_NAME, ColumnType::String),
            ColumnDef::required(RESOURCE_IP, ColumnType::String),
            ColumnDef::required(RESOURCE_URL, ColumnType::String),
            ColumnDef::required(USER_NAME, ColumnType::String),
            ColumnDef::required(ENROLL_ID, ColumnType::String),
            ColumnDef::required(IS_AUTHORIZED, ColumnType::Bool),
            ColumnDef::required(DATE_TIME, ColumnType::String),
            ColumnDef::required(PREVIOUS_HASH, ColumnType::Bytes),
        ],
    )
}

/// Schema of [`RESOURCE_TABLE`].
#[must_use]
pub fn resource_schema() -> TableSchema {
    TableSchema::new(
        RESOURCE_TABLE,
        vec![
            ColumnDef::key(RESOURCE_NAME, ColumnType::String),
            ColumnDef::required(RESOURCE_IP, ColumnType::String),
            ColumnDef::required(RESOURCE_URL, ColumnType::String),
        ],
    )
}

/// Every table created at initialization, in creation order.
#[must_use]
pub fn ledger_schemas() -> Vec<TableSchema> {
    vec![ia_manager_schema(), access_log_schema(), resource_schema()]
}
