//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Root configuration structure.
///
/// Sections: `source`, `target`, `options`, `type_mappings`, `logging`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database configuration (MySQL/MariaDB).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub options: MigrationOptions,

    /// Type mapping overrides, keyed by source type token
    /// (e.g. `enum: varchar(32)`, `char(36): uuid`).
    #[serde(default)]
    pub type_mappings: BTreeMap<String, String>,

    /// Logging configuration, consumed by wrappers.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Source database (MySQL/MariaDB) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Engine tag ("mysql" or "mariadb").
    #[serde(default = "default_mysql")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Username.
    #[serde(alias = "user")]
    pub username: String,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Database (schema) name.
    pub database: String,

    /// Open-ended driver options passed through to the connector.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("options", &self.options)
            .finish()
    }
}

/// Target database (PostgreSQL) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Engine tag ("postgres" or "postgresql").
    #[serde(default = "default_postgres")]
    pub r#type: String,

    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Username.
    #[serde(alias = "user")]
    pub username: String,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Database name.
    pub database: String,

    /// Target schema (default: "public").
    #[serde(default = "default_public_schema")]
    pub schema: String,

    /// SSL mode: disable, require, verify-ca, verify-full (default: disable).
    #[serde(default = "default_disable")]
    pub ssl_mode: String,

    /// Open-ended driver options passed through to the connector.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("type", &self.r#type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("ssl_mode", &self.ssl_mode)
            .field("options", &self.options)
            .finish()
    }
}

/// How ENUM columns are rendered at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumMode {
    /// varchar(255) plus a CHECK constraint over the literal values.
    #[default]
    Varchar,

    /// A native CREATE TYPE ... AS ENUM per column.
    Native,
}

/// How invalid zero dates (`0000-00-00 ...`) are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDatePolicy {
    /// Translate to NULL and warn.
    #[default]
    Null,

    /// Substitute the Unix epoch.
    Epoch,
}

/// Migration behavior configuration.
///
/// A clone of this struct is snapshotted into the migration plan at
/// `migrate()` entry; edits made afterwards do not affect the running
/// migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Tables to include (literal names or `*`/`?` glob patterns).
    /// Empty selects all tables.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Tables to exclude (same matching rules).
    #[serde(default)]
    pub exclude_tables: Vec<String>,

    /// Rows per batch (default: 1000).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Number of parallel table workers (default: 4).
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Drop target tables before creating them (default: true).
    #[serde(default = "default_true")]
    pub drop_target: bool,

    /// Migrate secondary indexes (default: true).
    #[serde(default = "default_true")]
    pub migrate_indexes: bool,

    /// Migrate foreign keys (default: true).
    #[serde(default = "default_true")]
    pub migrate_foreign_keys: bool,

    /// Per-table WHERE fragments appended to the source SELECT.
    #[serde(default)]
    pub where_clauses: BTreeMap<String, String>,

    /// Commit the target transaction every N batches (default: 1).
    #[serde(default = "default_commit_every")]
    pub commit_every: usize,

    /// Create secondary indexes after data load (default: true).
    #[serde(default = "default_true")]
    pub indexes_after_data: bool,

    /// Stop feeding the work queue after the first failed table
    /// (default: false).
    #[serde(default)]
    pub stop_on_error: bool,

    /// Drop a table's partially loaded data when its transfer fails
    /// (default: false - leave for inspection).
    #[serde(default)]
    pub drop_on_failure: bool,

    /// ENUM rendering mode (default: varchar).
    #[serde(default)]
    pub enum_mode: EnumMode,

    /// Zero-date handling (default: null).
    #[serde(default)]
    pub zero_date: ZeroDatePolicy,

    /// Emit a data progress event every N rows within a table
    /// (default: 50000).
    #[serde(default = "default_progress_rows")]
    pub progress_rows: u64,

    /// Connect timeout in seconds (default: 30).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-statement timeout in seconds; 0 disables (default: 0).
    #[serde(default)]
    pub statement_timeout_secs: u64,

    /// Transient connection errors are retried this many times with
    /// exponential backoff (default: 3).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            exclude_tables: Vec::new(),
            batch_size: default_batch_size(),
            workers: default_workers(),
            drop_target: true,
            migrate_indexes: true,
            migrate_foreign_keys: true,
            where_clauses: BTreeMap::new(),
            commit_every: default_commit_every(),
            indexes_after_data: true,
            stop_on_error: false,
            drop_on_failure: false,
            enum_mode: EnumMode::default(),
            zero_date: ZeroDatePolicy::default(),
            progress_rows: default_progress_rows(),
            connect_timeout_secs: default_connect_timeout(),
            statement_timeout_secs: 0,
            max_retries: default_max_retries(),
        }
    }
}

impl MigrationOptions {
    /// WHERE fragment configured for a table, if any.
    pub fn where_clause_for(&self, table: &str) -> Option<&str> {
        self.where_clauses.get(table).map(|s| s.as_str())
    }
}

/// Logging configuration. The library itself only emits `tracing` events;
/// wrappers consume this section to install a subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (default: "info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Optional log file path.
    #[serde(default)]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// Default value functions for serde
fn default_mysql() -> String {
    "mysql".to_string()
}

fn default_postgres() -> String {
    "postgres".to_string()
}

fn default_mysql_port() -> u16 {
    3306
}

fn default_pg_port() -> u16 {
    5432
}

fn default_public_schema() -> String {
    "public".to_string()
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_batch_size() -> usize {
    1000
}

fn default_workers() -> usize {
    4
}

fn default_commit_every() -> usize {
    1
}

fn default_progress_rows() -> u64 {
    50_000
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
