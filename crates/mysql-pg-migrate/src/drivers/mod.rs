//! Database driver implementations.
//!
//! Each driver module implements the core traits for one engine:
//!
//! - [`mysql`]: MySQL/MariaDB source (dialect + reader)
//! - [`postgres`]: PostgreSQL target (dialect + writer)
//!
//! [`DialectImpl`] provides enum-based static dispatch over the dialects.
//! Adding an engine is adding a module and a variant here, not patching
//! call sites.

pub mod mysql;
pub mod postgres;

pub use mysql::{MysqlDialect, MysqlReader};
pub use postgres::{PostgresDialect, PostgresWriter, TableWriteSession};

use crate::core::traits::{Dialect, DialectCaps, TxnKind};
use crate::typemap::LogicalType;

/// Enum-based static dispatch for dialects.
#[derive(Debug, Clone)]
pub enum DialectImpl {
    Mysql(MysqlDialect),
    Postgres(PostgresDialect),
}

impl DialectImpl {
    /// Create a dialect implementation from an engine tag.
    pub fn from_db_type(db_type: &str) -> crate::error::Result<Self> {
        match db_type.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectImpl::Mysql(MysqlDialect::new())),
            "postgres" | "postgresql" | "pg" => Ok(DialectImpl::Postgres(PostgresDialect::new())),
            other => Err(crate::error::MigrateError::Config(format!(
                "Unknown database type: '{}'. Supported types: mysql, postgres",
                other
            ))),
        }
    }
}

impl Dialect for DialectImpl {
    fn name(&self) -> &str {
        match self {
            DialectImpl::Mysql(d) => d.name(),
            DialectImpl::Postgres(d) => d.name(),
        }
    }

    fn quote_ident(&self, name: &str) -> String {
        match self {
            DialectImpl::Mysql(d) => d.quote_ident(name),
            DialectImpl::Postgres(d) => d.quote_ident(name),
        }
    }

    fn placeholder(&self, index: usize) -> String {
        match self {
            DialectImpl::Mysql(d) => d.placeholder(index),
            DialectImpl::Postgres(d) => d.placeholder(index),
        }
    }

    fn bulk_insert_sql(
        &self,
        qualified_table: &str,
        columns: &[String],
        row_count: usize,
    ) -> String {
        match self {
            DialectImpl::Mysql(d) => d.bulk_insert_sql(qualified_table, columns, row_count),
            DialectImpl::Postgres(d) => d.bulk_insert_sql(qualified_table, columns, row_count),
        }
    }

    fn identity_sql(&self, kind: &LogicalType) -> String {
        match self {
            DialectImpl::Mysql(d) => d.identity_sql(kind),
            DialectImpl::Postgres(d) => d.identity_sql(kind),
        }
    }

    fn sequence_resync_sql(&self, schema: &str, table: &str, column: &str) -> Option<String> {
        match self {
            DialectImpl::Mysql(d) => d.sequence_resync_sql(schema, table, column),
            DialectImpl::Postgres(d) => d.sequence_resync_sql(schema, table, column),
        }
    }

    fn isolation_sql(&self, kind: TxnKind) -> Option<&'static str> {
        match self {
            DialectImpl::Mysql(d) => d.isolation_sql(kind),
            DialectImpl::Postgres(d) => d.isolation_sql(kind),
        }
    }

    fn begin_sql(&self, kind: TxnKind) -> &'static str {
        match self {
            DialectImpl::Mysql(d) => d.begin_sql(kind),
            DialectImpl::Postgres(d) => d.begin_sql(kind),
        }
    }

    fn caps(&self) -> DialectCaps {
        match self {
            DialectImpl::Mysql(d) => d.caps(),
            DialectImpl::Postgres(d) => d.caps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_impl_from_db_type() {
        let mysql = DialectImpl::from_db_type("mysql").unwrap();
        assert_eq!(mysql.name(), "mysql");

        let postgres = DialectImpl::from_db_type("postgres").unwrap();
        assert_eq!(postgres.name(), "postgres");

        assert!(DialectImpl::from_db_type("mariadb").is_ok());
        assert!(DialectImpl::from_db_type("postgresql").is_ok());
        assert!(DialectImpl::from_db_type("pg").is_ok());

        assert!(DialectImpl::from_db_type("oracle").is_err());
    }

    #[test]
    fn test_dialect_impl_dispatch() {
        let dialect = DialectImpl::Postgres(PostgresDialect::new());
        assert_eq!(dialect.quote_ident("table"), "\"table\"");
        assert_eq!(dialect.placeholder(1), "$1");

        let dialect = DialectImpl::Mysql(MysqlDialect::new());
        assert_eq!(dialect.quote_ident("table"), "`table`");
        assert_eq!(dialect.placeholder(1), "?");
    }
}
