//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! Provides MySQL-specific SQL syntax for identifier quoting, bulk insert
//! statements, transaction verbs, and parameter placeholders. Compatible
//! with MySQL 5.7+, 8.0+, and MariaDB 10.2+.

use crate::core::traits::{Dialect, DialectCaps, TxnKind};
use crate::typemap::LogicalType;

/// MySQL/MariaDB dialect implementation.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Backticks; embedded backticks are doubled
        format!("`{}`", name.replace('`', "``"))
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
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

        let row_tuple = format!(
            "({})",
            columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ")
        );
        let values = std::iter::repeat(row_tuple)
            .take(row_count)
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            qualified_table, col_list, values
        )
    }

    fn identity_sql(&self, _kind: &LogicalType) -> String {
        "AUTO_INCREMENT".to_string()
    }

    fn sequence_resync_sql(&self, _schema: &str, _table: &str, _column: &str) -> Option<String> {
        // AUTO_INCREMENT counters follow inserted values automatically.
        None
    }

    fn isolation_sql(&self, kind: TxnKind) -> Option<&'static str> {
        match kind {
            TxnKind::SourceScan => Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ"),
            TxnKind::TargetWrite => None,
        }
    }

    fn begin_sql(&self, kind: TxnKind) -> &'static str {
        match kind {
            TxnKind::SourceScan => "START TRANSACTION WITH CONSISTENT SNAPSHOT",
            TxnKind::TargetWrite => "START TRANSACTION",
        }
    }

    fn caps(&self) -> DialectCaps {
        DialectCaps {
            deferrable_constraints: false,
            truncate_cascade: false,
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
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
    }

    #[test]
    fn test_placeholder() {
        let dialect = MysqlDialect::new();
        assert_eq!(dialect.placeholder(1), "?");
        assert_eq!(dialect.placeholder(10), "?");
    }

    #[test]
    fn test_bulk_insert_sql() {
        let dialect = MysqlDialect::new();
        let sql = dialect.bulk_insert_sql(
            "`shop`.`users`",
            &["id".to_string(), "email".to_string()],
            2,
        );
        assert_eq!(
            sql,
            "INSERT INTO `shop`.`users` (`id`, `email`) VALUES (?, ?), (?, ?)"
        );
    }

    #[test]
    fn test_transaction_verbs() {
        let dialect = MysqlDialect::new();
        assert_eq!(
            dialect.isolation_sql(TxnKind::SourceScan),
            Some("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
        );
        assert_eq!(
            dialect.begin_sql(TxnKind::SourceScan),
            "START TRANSACTION WITH CONSISTENT SNAPSHOT"
        );
        assert_eq!(dialect.commit_sql(), "COMMIT");
        assert_eq!(dialect.rollback_sql(), "ROLLBACK");
    }

    #[test]
    fn test_no_sequence_resync() {
        let dialect = MysqlDialect::new();
        assert!(dialect.sequence_resync_sql("shop", "users", "id").is_none());
    }
}
