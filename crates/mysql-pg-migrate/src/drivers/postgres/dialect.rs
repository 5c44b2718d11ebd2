//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific SQL syntax for identifier quoting, bulk
//! insert statements, identity/sequence handling, and parameter
//! placeholders.

use crate::core::identifier::quote_literal;
use crate::core::traits::{Dialect, DialectCaps, TxnKind};
use crate::typemap::LogicalType;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Double quotes; embedded double quotes are doubled
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn bulk_insert_sql(
        &self,
        qualified_table: &str,
        columns: &[String],
        row_count: usize,
    ) -> String {
        let col_list = columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");

        let width = columns.len();
        let mut values = String::new();
        for row in 0..row_count {
            if row > 0 {
                values.push_str(", ");
            }
            values.push('(');
            for col in 0..width {
                if col > 0 {
                    values.push_str(", ");
                }
                values.push_str(&self.placeholder(row * width + col + 1));
            }
            values.push(')');
        }

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            qualified_table, col_list, values
        )
    }

    fn identity_sql(&self, kind: &LogicalType) -> String {
        match kind {
            LogicalType::Int8 | LogicalType::Int16 => "smallserial".to_string(),
            LogicalType::Int64 => "bigserial".to_string(),
            _ => "serial".to_string(),
        }
    }

    fn sequence_resync_sql(&self, schema: &str, table: &str, column: &str) -> Option<String> {
        let qualified = self.qualify(schema, table);
        // setval(..., max, true) makes the next generated value max + 1
        Some(format!(
            "SELECT setval(pg_get_serial_sequence({}, {}), \
             COALESCE((SELECT MAX({}) FROM {}), 1), true)",
            quote_literal(&qualified),
            quote_literal(column),
            self.quote_ident(column),
            qualified
        ))
    }

    fn begin_sql(&self, kind: TxnKind) -> &'static str {
        match kind {
            TxnKind::SourceScan => "BEGIN ISOLATION LEVEL REPEATABLE READ",
            TxnKind::TargetWrite => "BEGIN",
        }
    }

    fn caps(&self) -> DialectCaps {
        DialectCaps {
            deferrable_constraints: true,
            truncate_cascade: true,
            native_enums: true,
            server_side_cursors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("name"), "\"name\"");
        assert_eq!(dialect.quote_ident("ta\"ble"), "\"ta\"\"ble\"");
    }

    #[test]
    fn test_placeholder() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.placeholder(1), "$1");
        assert_eq!(dialect.placeholder(42), "$42");
    }

    #[test]
    fn test_bulk_insert_sql() {
        let dialect = PostgresDialect::new();
        let sql = dialect.bulk_insert_sql(
            "\"public\".\"users\"",
            &["id".to_string(), "email".to_string()],
            2,
        );
        assert_eq!(
            sql,
            "INSERT INTO \"public\".\"users\" (\"id\", \"email\") \
             VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn test_bulk_insert_sql_single_row() {
        let dialect = PostgresDialect::new();
        let sql = dialect.bulk_insert_sql("\"public\".\"t\"", &["a".to_string()], 1);
        assert_eq!(sql, "INSERT INTO \"public\".\"t\" (\"a\") VALUES ($1)");
    }

    #[test]
    fn test_identity_tokens() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.identity_sql(&LogicalType::Int32), "serial");
        assert_eq!(dialect.identity_sql(&LogicalType::Int64), "bigserial");
        assert_eq!(dialect.identity_sql(&LogicalType::Int16), "smallserial");
    }

    #[test]
    fn test_sequence_resync_sql() {
        let dialect = PostgresDialect::new();
        let sql = dialect
            .sequence_resync_sql("public", "users", "id")
            .unwrap();
        assert!(sql.contains("pg_get_serial_sequence('\"public\".\"users\"', 'id')"));
        assert!(sql.contains("MAX(\"id\")"));
        assert!(sql.ends_with(", true)"));
    }

    #[test]
    fn test_transaction_verbs() {
        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.begin_sql(TxnKind::SourceScan),
            "BEGIN ISOLATION LEVEL REPEATABLE READ"
        );
        assert_eq!(dialect.begin_sql(TxnKind::TargetWrite), "BEGIN");
        assert!(dialect.isolation_sql(TxnKind::TargetWrite).is_none());
    }

    #[test]
    fn test_caps() {
        let caps = PostgresDialect::new().caps();
        assert!(caps.deferrable_constraints);
        assert!(caps.truncate_cascade);
    }
}
