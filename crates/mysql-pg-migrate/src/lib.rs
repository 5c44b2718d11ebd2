//! # mysql-pg-migrate
//!
//! MySQL/MariaDB to PostgreSQL migration library.
//!
//! This library provides the core functionality for migrating relational
//! data from a MySQL-family source into a PostgreSQL-family target:
//!
//! - **Schema translation** with a logical type-mapping subsystem and
//!   user-supplied overrides
//! - **Streamed row transfer** in bounded batches with parameterized bulk
//!   inserts
//! - **FK-aware orchestration**: dependency-ordered table loading with
//!   deferred foreign-key installation
//! - **Sequence reconciliation** for auto-increment/identity columns
//! - **Parallel transfers** across tables with a configurable worker pool
//!
//! ## Example
//!
//! ```rust,no_run
//! use mysql_pg_migrate::{Config, Migrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let migrator = Migrator::from_config(config);
//!     migrator.set_progress_callback(|event| {
//!         println!("[{}] {}", event.phase, event.message);
//!     });
//!     let result = migrator.migrate().await?;
//!     println!("Migrated {} rows", result.rows_copied);
//!     std::process::exit(result.exit_code());
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod translator;
pub mod typemap;

// Re-exports for convenient access
pub use config::{
    Config, EnumMode, LoggingConfig, MigrationOptions, SourceConfig, TargetConfig, ZeroDatePolicy,
};
pub use crate::core::schema::{Column, DefaultValue, ForeignKey, Index, MigrationPlan, Table};
pub use crate::core::value::{Batch, SqlNullType, SqlValue};
pub use drivers::{DialectImpl, MysqlDialect, MysqlReader, PostgresDialect, PostgresWriter};
pub use error::{MigrateError, Result};
pub use orchestrator::{
    new_migrator, ConnectionStatus, MigrationResult, Migrator, Phase, ProgressEvent,
    ProgressSink, TableResult, TableStatus,
};
pub use pipeline::{PipelineStats, RowPipeline, TableJob};
pub use translator::{SchemaTranslator, TableDdl};
pub use typemap::{LogicalType, TypeOverrides};
