//! Schema and metadata types for database tables, columns, indexes, and constraints.
//!
//! These types provide a database-agnostic representation of schema metadata
//! used throughout the migration process. Descriptors are built once from live
//! introspection and are immutable for the duration of a run.

use serde::{Deserialize, Serialize};

use crate::config::MigrationOptions;

/// Default value of a column, with provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultValue {
    /// Raw default expression as reported by the source catalog.
    pub expr: String,

    /// True when the default is an engine function (`CURRENT_TIMESTAMP`,
    /// expression defaults) rather than a literal.
    pub is_function: bool,
}

impl DefaultValue {
    pub fn literal(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            is_function: false,
        }
    }

    pub fn function(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            is_function: true,
        }
    }
}

/// Column metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Base data type token (e.g., "int", "varchar", "enum").
    pub data_type: String,

    /// Full column type text (e.g., "int(10) unsigned", "enum('a','b')").
    /// Carries the modifiers the base token drops.
    pub column_type: String,

    /// Maximum length for string/binary types (0 when not applicable,
    /// -1 for unbounded LONGTEXT-class types).
    pub max_length: i32,

    /// Numeric precision.
    pub precision: i32,

    /// Numeric scale.
    pub scale: i32,

    /// Whether the column allows NULL.
    pub is_nullable: bool,

    /// Whether the column is an auto-increment/identity column.
    pub is_identity: bool,

    /// Dense, zero-based ordinal position. Row tuples produced by the
    /// pipeline match this ordering exactly.
    pub ordinal: usize,

    /// Default expression, if any.
    pub default: Option<DefaultValue>,

    /// Column comment.
    pub comment: String,
}

impl Column {
    /// True when the full column type carries the `unsigned` modifier.
    pub fn is_unsigned(&self) -> bool {
        self.column_type.to_lowercase().contains("unsigned")
    }
}

/// Index metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed column names, in key order.
    pub columns: Vec<String>,

    /// Whether the index is unique.
    pub is_unique: bool,

    /// Whether this is the primary-key index.
    pub is_primary: bool,
}

/// Foreign key metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Local column names, in constraint order.
    pub columns: Vec<String>,

    /// Referenced table name (same source schema).
    pub ref_table: String,

    /// Referenced column names, in constraint order.
    pub ref_columns: Vec<String>,

    /// ON DELETE action as reported by the source (RESTRICT, CASCADE, ...).
    pub on_delete: String,

    /// ON UPDATE action as reported by the source.
    pub on_update: String,
}

/// Table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Schema (database) name.
    pub schema: String,

    /// Table name.
    pub name: String,

    /// Column definitions in ordinal order.
    pub columns: Vec<Column>,

    /// Primary key column names.
    pub primary_key: Vec<String>,

    /// Indexes, primary key first when present.
    pub indexes: Vec<Index>,

    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,

    /// Approximate row count as reported by the engine.
    pub row_count: i64,

    /// Engine-reported byte size.
    pub data_length: i64,
}

impl Table {
    /// Get the fully qualified table name.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema, self.name)
    }

    /// Check if the table has a primary key.
    pub fn has_pk(&self) -> bool {
        !self.primary_key.is_empty()
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// The identity (auto-increment) column, if any.
    pub fn identity_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_identity)
    }

    /// Names of tables this table references through foreign keys,
    /// excluding self-references.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self
            .foreign_keys
            .iter()
            .map(|fk| fk.ref_table.as_str())
            .filter(|t| *t != self.name)
            .collect();
        refs.sort_unstable();
        refs.dedup();
        refs
    }
}

/// Finalized migration plan: tables in dependency order plus the
/// configuration snapshot taken at `migrate()` entry.
#[derive(Debug, Clone)]
pub struct MigrationPlan {
    /// Tables in topological order (referenced tables first).
    pub tables: Vec<Table>,

    /// Table names that participate in a foreign-key cycle. Their mutual
    /// ordering is arbitrary and their FKs install in the post-step.
    pub cyclic: Vec<String>,

    /// Immutable options snapshot; later edits to the migrator do not
    /// affect a running migration.
    pub options: MigrationOptions,
}

impl MigrationPlan {
    /// Total estimated rows across the plan.
    pub fn estimated_rows(&self) -> i64 {
        self.tables.iter().map(|t| t.row_count.max(0)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn make_column(name: &str, data_type: &str, ordinal: usize) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: data_type.to_string(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: true,
            is_identity: false,
            ordinal,
            default: None,
            comment: String::new(),
        }
    }

    fn make_table(name: &str, fks: Vec<ForeignKey>) -> Table {
        Table {
            schema: "shop".to_string(),
            name: name.to_string(),
            columns: vec![make_column("id", "int", 0)],
            primary_key: vec!["id".to_string()],
            indexes: vec![],
            foreign_keys: fks,
            row_count: 10,
            data_length: 4096,
        }
    }

    fn fk(name: &str, ref_table: &str) -> ForeignKey {
        ForeignKey {
            name: name.to_string(),
            columns: vec!["ref_id".to_string()],
            ref_table: ref_table.to_string(),
            ref_columns: vec!["id".to_string()],
            on_delete: "RESTRICT".to_string(),
            on_update: "RESTRICT".to_string(),
        }
    }

    #[test]
    fn test_full_name() {
        let table = make_table("orders", vec![]);
        assert_eq!(table.full_name(), "shop.orders");
    }

    #[test]
    fn test_referenced_tables_dedup_and_skip_self() {
        let table = make_table(
            "orders",
            vec![fk("fk_a", "users"), fk("fk_b", "users"), fk("fk_c", "orders")],
        );
        assert_eq!(table.referenced_tables(), vec!["users"]);
    }

    #[test]
    fn test_identity_column() {
        let mut table = make_table("users", vec![]);
        assert!(table.identity_column().is_none());
        table.columns[0].is_identity = true;
        assert_eq!(table.identity_column().unwrap().name, "id");
    }

    #[test]
    fn test_is_unsigned() {
        let mut col = make_column("n", "int", 0);
        assert!(!col.is_unsigned());
        col.column_type = "int(10) UNSIGNED".to_string();
        assert!(col.is_unsigned());
    }
}
