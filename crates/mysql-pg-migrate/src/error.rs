//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, unknown engine tag, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database connection or query error
    #[error("Source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// Target database connection or query error
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// Schema extraction failed
    #[error("Schema extraction failed: {0}")]
    SchemaExtraction(String),

    /// One or more columns have no type mapping to the target engine.
    /// Collected across the whole plan and reported in one batch.
    #[error("Unmapped column types:\n{}", .columns.join("\n"))]
    Mapping { columns: Vec<String> },

    /// Target rejected translated DDL for a table
    #[error("DDL failed for table {table}: {message}")]
    Ddl { table: String, message: String },

    /// Data transfer failed for a specific table
    #[error("Transfer failed for table {table}: {message}")]
    Transfer { table: String, message: String },

    /// Deferred foreign-key installation failed after data load
    #[error("Integrity error on table {table}: {message}")]
    Integrity { table: String, message: String },

    /// A per-operation timeout elapsed
    #[error("Timed out during {operation} after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Migration was cancelled (SIGINT, caller request)
    #[error("Migration cancelled")]
    Cancelled,
}

impl MigrateError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl ToString, context: impl Into<String>) -> Self {
        MigrateError::Pool {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Transfer error
    pub fn transfer(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Transfer {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create a Ddl error
    pub fn ddl(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Ddl {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an Integrity error
    pub fn integrity(table: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Integrity {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Process exit code for CLI wrappers.
    ///
    /// 1 = configuration error, 2 = connection error, 4 = cancelled.
    /// Partial failures (exit 3) never surface as an `Err`; they are encoded
    /// in the [`MigrationResult`](crate::orchestrator::MigrationResult).
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrateError::Config(_)
            | MigrateError::Mapping { .. }
            | MigrateError::Yaml(_)
            | MigrateError::Json(_)
            | MigrateError::Io(_) => 1,
            MigrateError::Cancelled => 4,
            _ => 2,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(MigrateError::Config("bad".into()).exit_code(), 1);
        assert_eq!(
            MigrateError::Mapping {
                columns: vec!["t.c: geometry".into()]
            }
            .exit_code(),
            1
        );
        assert_eq!(MigrateError::Cancelled.exit_code(), 4);
        assert_eq!(MigrateError::pool("refused", "connecting").exit_code(), 2);
        assert_eq!(MigrateError::transfer("users", "boom").exit_code(), 2);
    }

    #[test]
    fn test_mapping_error_lists_all_columns() {
        let err = MigrateError::Mapping {
            columns: vec![
                "shop.items.shape: geometry".into(),
                "shop.items.location: point".into(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("shop.items.shape"));
        assert!(msg.contains("shop.items.location"));
    }
}
