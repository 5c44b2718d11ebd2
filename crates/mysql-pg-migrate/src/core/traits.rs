//! Core traits for database-agnostic data migration.
//!
//! - [`Dialect`]: SQL syntax strategy per engine (quoting, placeholders,
//!   transaction verbs, identity and sequence SQL, capability flags)
//! - [`SourceReader`]: reads schema and streams rows from the source
//! - [`TargetWriter`]: runs DDL and utility statements against the target
//!
//! Engine-specific SQL text never leaks past these seams; adding an engine
//! is adding an implementation, not patching call sites.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::typemap::LogicalType;

use super::schema::Table;
use super::value::Batch;

/// Which side of the migration a transaction serves. Source scans run under
/// REPEATABLE READ so one table sees one snapshot; target writes use the
/// engine default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    SourceScan,
    TargetWrite,
}

/// Engine capability flags consulted by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectCaps {
    /// Constraints can be declared DEFERRABLE.
    pub deferrable_constraints: bool,
    /// TRUNCATE supports CASCADE.
    pub truncate_cascade: bool,
    /// Native enumerated types exist.
    pub native_enums: bool,
    /// Server-side streaming of large result sets.
    pub server_side_cursors: bool,
}

/// SQL syntax strategy for a database engine.
pub trait Dialect: Send + Sync {
    /// Get the dialect identifier (e.g., "mysql", "postgres").
    fn name(&self) -> &str;

    /// Quote an identifier (table name, column name, etc.).
    ///
    /// - MySQL: `` `identifier` ``
    /// - PostgreSQL: `"identifier"`
    fn quote_ident(&self, name: &str) -> String;

    /// Quote a schema-qualified table reference.
    fn qualify(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.quote_ident(schema), self.quote_ident(table))
    }

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - MySQL: `?`
    /// - PostgreSQL: `$1`, `$2`, ...
    fn placeholder(&self, index: usize) -> String;

    /// Build a parameterized multi-row INSERT for `row_count` rows.
    fn bulk_insert_sql(&self, qualified_table: &str, columns: &[String], row_count: usize)
        -> String;

    /// Identity/auto-increment clause or type token for DDL emission.
    fn identity_sql(&self, kind: &LogicalType) -> String;

    /// Statement that resynchronizes the identity generator of `column` to
    /// the maximum migrated value. `None` when the engine has no detached
    /// sequence to resync.
    fn sequence_resync_sql(&self, schema: &str, table: &str, column: &str) -> Option<String>;

    /// Statement that sets the isolation level for the next transaction,
    /// when the engine needs it issued separately from BEGIN.
    fn isolation_sql(&self, _kind: TxnKind) -> Option<&'static str> {
        None
    }

    /// Transaction verbs with isolation appropriate for `kind`.
    fn begin_sql(&self, kind: TxnKind) -> &'static str;

    fn commit_sql(&self) -> &'static str {
        "COMMIT"
    }

    fn rollback_sql(&self) -> &'static str {
        "ROLLBACK"
    }

    /// Engine capability flags.
    fn caps(&self) -> DialectCaps;
}

/// Options for streaming rows from a source table.
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Schema name.
    pub schema: String,
    /// Table name.
    pub table: String,
    /// Columns to read, in ordinal order.
    pub columns: Vec<String>,
    /// Logical types per column, driving value decoding.
    pub kinds: Vec<LogicalType>,
    /// Optional user WHERE fragment appended to the SELECT.
    pub where_clause: Option<String>,
    /// Rows per emitted batch; also the driver fetch size.
    pub batch_size: usize,
}

/// Read schema and data from a source database.
///
/// [`read_table`](SourceReader::read_table) returns a bounded channel
/// receiver; the background producer blocks when the consumer falls behind,
/// which is the pipeline's back-pressure.
#[async_trait]
pub trait SourceReader: Send + Sync {
    /// Verify connectivity with a trivial round-trip.
    async fn test_connection(&self) -> Result<()>;

    /// Extract table metadata (columns, primary key, row estimates) for
    /// every base table in the schema.
    async fn extract_schema(&self, schema: &str) -> Result<Vec<Table>>;

    /// Load index metadata for a table.
    async fn load_indexes(&self, table: &mut Table) -> Result<()>;

    /// Load foreign key metadata for a table.
    async fn load_foreign_keys(&self, table: &mut Table) -> Result<()>;

    /// Start streaming rows from a table in source-natural order.
    fn read_table(&self, opts: ReadOptions) -> mpsc::Receiver<Result<Batch>>;

    /// Exact row count, optionally under a WHERE fragment.
    async fn get_row_count(&self, schema: &str, table: &str, where_clause: Option<&str>)
        -> Result<i64>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

/// Run DDL and utility statements against the target database.
#[async_trait]
pub trait TargetWriter: Send + Sync {
    /// Verify connectivity with a trivial round-trip.
    async fn test_connection(&self) -> Result<()>;

    /// Create the target schema if it doesn't exist.
    async fn create_schema(&self, schema: &str) -> Result<()>;

    /// Execute one DDL statement.
    async fn execute_ddl(&self, sql: &str) -> Result<()>;

    /// Check if a table exists.
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool>;

    /// Drop a table if it exists.
    async fn drop_table(&self, schema: &str, table: &str) -> Result<()>;

    /// Resynchronize identity sequences for a table after data load.
    async fn reset_sequence(&self, schema: &str, table: &Table) -> Result<()>;

    /// Exact row count of a target table.
    async fn get_row_count(&self, schema: &str, table: &str) -> Result<i64>;

    /// Get the database type identifier.
    fn db_type(&self) -> &str;

    /// Close the connection pool.
    async fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options_shape() {
        let opts = ReadOptions {
            schema: "shop".into(),
            table: "users".into(),
            columns: vec!["id".into(), "email".into()],
            kinds: vec![LogicalType::Int32, LogicalType::Varchar(255)],
            where_clause: None,
            batch_size: 1000,
        };
        assert_eq!(opts.columns.len(), opts.kinds.len());
        assert_eq!(opts.batch_size, 1000);
    }
}
