//! Schema translation: source table descriptors to target DDL.
//!
//! Consumes a [`Table`] descriptor plus the type mapper output and emits
//! the target `CREATE TABLE`, secondary index DDL, and deferred FK DDL.
//! FK statements are returned as a list the orchestrator applies only
//! after all row data is loaded.

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{EnumMode, MigrationOptions};
use crate::core::identifier::{quote_literal, validate_identifier};
use crate::core::schema::Table;
use crate::core::traits::Dialect;
use crate::drivers::DialectImpl;
use crate::error::{MigrateError, Result};
use crate::typemap::{map_column, translate_default, LogicalType, TypeOverrides};

/// Translated DDL for one table.
#[derive(Debug, Clone)]
pub struct TableDdl {
    /// `DROP TABLE IF EXISTS .. CASCADE`, present when drop_target is set.
    pub drop: Option<String>,

    /// `CREATE TYPE .. AS ENUM` statements (native enum mode only),
    /// applied before the create.
    pub enum_types: Vec<String>,

    /// The `CREATE TABLE` statement with inline primary key.
    pub create: String,

    /// Secondary index DDL (primary key excluded).
    pub indexes: Vec<String>,

    /// Deferred FK DDL, applied after all row data is loaded.
    pub foreign_keys: Vec<String>,

    /// Per-column logical types in ordinal order, consumed by the pipeline
    /// for row decoding.
    pub kinds: Vec<LogicalType>,

    /// Lossy-mapping and default-rewrite warnings.
    pub warnings: Vec<String>,
}

/// Translates source tables into target-dialect DDL.
///
/// Holds the index-name namespace for the whole migration: PostgreSQL
/// index names are schema-global while MySQL's are per-table, so repeats
/// get a short hash of `table.index` appended.
pub struct SchemaTranslator {
    dialect: DialectImpl,
    target_schema: String,
    overrides: TypeOverrides,
    options: MigrationOptions,
    seen_index_names: HashSet<String>,
}

impl SchemaTranslator {
    pub fn new(
        target_schema: impl Into<String>,
        dialect: DialectImpl,
        overrides: TypeOverrides,
        options: MigrationOptions,
    ) -> Self {
        Self {
            dialect,
            target_schema: target_schema.into(),
            overrides,
            options,
            seen_index_names: HashSet::new(),
        }
    }

    /// Translate one table. Fails with [`MigrateError::Mapping`] listing
    /// every unmapped column in the table; the orchestrator merges these
    /// across the plan so a run reports all offenders at once.
    pub fn translate(&mut self, table: &Table) -> Result<TableDdl> {
        validate_identifier(&table.name)?;
        for col in &table.columns {
            validate_identifier(&col.name)?;
        }

        let qualified = self.dialect.qualify(&self.target_schema, &table.name);
        let mut warnings = Vec::new();
        let mut kinds = Vec::with_capacity(table.columns.len());
        let mut unmapped = Vec::new();
        let mut enum_types = Vec::new();
        let mut col_defs = Vec::with_capacity(table.columns.len());

        for col in &table.columns {
            let mapping = map_column(col, &self.overrides, self.options.enum_mode);
            if let Some(w) = &mapping.warning {
                warnings.push(format!("{}.{}: {}", table.name, col.name, w));
            }

            let Some(mut target_type) = mapping.target_type.clone() else {
                unmapped.push(format!(
                    "{}.{}.{}: {}",
                    table.schema, table.name, col.name, col.column_type
                ));
                kinds.push(mapping.kind);
                continue;
            };

            let mut def = String::new();
            def.push_str(&self.dialect.quote_ident(&col.name));
            def.push(' ');

            if col.is_identity {
                // Serial types imply NOT NULL and a backing sequence; the
                // sequence is resynced after data load.
                def.push_str(&self.dialect.identity_sql(&mapping.kind));
                col_defs.push(def);
                kinds.push(mapping.kind);
                continue;
            }

            if let (EnumMode::Native, LogicalType::Enum(values)) =
                (self.options.enum_mode, &mapping.kind)
            {
                let type_name = format!("{}_{}_enum", table.name, col.name);
                let qualified_type = self.dialect.qualify(&self.target_schema, &type_name);
                let literals = values
                    .iter()
                    .map(|v| quote_literal(v))
                    .collect::<Vec<_>>()
                    .join(", ");
                enum_types.push(format!(
                    "DROP TYPE IF EXISTS {} CASCADE;\nCREATE TYPE {} AS ENUM ({})",
                    qualified_type, qualified_type, literals
                ));
                target_type = qualified_type;
            }

            def.push_str(&target_type);

            if !col.is_nullable {
                def.push_str(" NOT NULL");
            }

            if let Some(default) = &col.default {
                let (sql, warning) =
                    translate_default(default, &mapping.kind, self.options.zero_date);
                if let Some(w) = warning {
                    warn!("{}.{}: {}", table.name, col.name, w);
                    warnings.push(format!("{}.{}: {}", table.name, col.name, w));
                }
                if let Some(sql) = sql {
                    def.push_str(&format!(" DEFAULT {}", sql));
                }
            }

            // Enum-as-varchar keeps the value domain through a CHECK.
            if self.options.enum_mode == EnumMode::Varchar && self.overrides.lookup(col).is_none()
            {
                if let LogicalType::Enum(values) = &mapping.kind {
                    if !values.is_empty() {
                        let literals = values
                            .iter()
                            .map(|v| quote_literal(v))
                            .collect::<Vec<_>>()
                            .join(", ");
                        def.push_str(&format!(
                            " CHECK ({} IN ({}))",
                            self.dialect.quote_ident(&col.name),
                            literals
                        ));
                    }
                }
            }

            col_defs.push(def);
            kinds.push(mapping.kind);
        }

        if !unmapped.is_empty() {
            return Err(MigrateError::Mapping { columns: unmapped });
        }

        if !table.primary_key.is_empty() {
            let pk_cols = table
                .primary_key
                .iter()
                .map(|c| self.dialect.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            col_defs.push(format!("PRIMARY KEY ({})", pk_cols));
        }

        let create = format!(
            "CREATE TABLE {} (\n    {}\n)",
            qualified,
            col_defs.join(",\n    ")
        );

        let drop = self.options.drop_target.then(|| {
            format!("DROP TABLE IF EXISTS {} CASCADE", qualified)
        });

        let indexes = if self.options.migrate_indexes {
            self.translate_indexes(table, &qualified)
        } else {
            Vec::new()
        };

        let foreign_keys = if self.options.migrate_foreign_keys {
            self.translate_foreign_keys(table, &qualified)
        } else {
            Vec::new()
        };

        Ok(TableDdl {
            drop,
            enum_types,
            create,
            indexes,
            foreign_keys,
            kinds,
            warnings,
        })
    }

    fn translate_indexes(&mut self, table: &Table, qualified: &str) -> Vec<String> {
        let mut statements = Vec::new();

        for idx in &table.indexes {
            if idx.is_primary {
                continue;
            }

            let name = self.resolve_index_name(&table.name, &idx.name);
            let unique = if idx.is_unique { "UNIQUE " } else { "" };
            let cols = idx
                .columns
                .iter()
                .map(|c| self.dialect.quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");

            statements.push(format!(
                "CREATE {}INDEX {} ON {} ({})",
                unique,
                self.dialect.quote_ident(&name),
                qualified,
                cols
            ));
        }

        statements
    }

    /// Index names live in one namespace at the target; repeats get a short
    /// hash of the original `table.index` appended.
    fn resolve_index_name(&mut self, table: &str, index: &str) -> String {
        let name = if self.seen_index_names.contains(index) {
            format!("{}_{}", index, short_hash(&format!("{}.{}", table, index)))
        } else {
            index.to_string()
        };
        self.seen_index_names.insert(index.to_string());
        self.seen_index_names.insert(name.clone());
        name
    }

    fn translate_foreign_keys(&self, table: &Table, qualified: &str) -> Vec<String> {
        table
            .foreign_keys
            .iter()
            .map(|fk| {
                let cols = fk
                    .columns
                    .iter()
                    .map(|c| self.dialect.quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", ");
                let ref_cols = fk
                    .ref_columns
                    .iter()
                    .map(|c| self.dialect.quote_ident(c))
                    .collect::<Vec<_>>()
                    .join(", ");

                format!(
                    "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) \
                     ON DELETE {} ON UPDATE {}",
                    qualified,
                    self.dialect.quote_ident(&fk.name),
                    cols,
                    self.dialect.qualify(&self.target_schema, &fk.ref_table),
                    ref_cols,
                    referential_action(&fk.on_delete),
                    referential_action(&fk.on_update)
                )
            })
            .collect()
    }
}

/// Map a source referential action onto the target's vocabulary.
fn referential_action(action: &str) -> &str {
    match action.to_uppercase().replace('_', " ").as_str() {
        "CASCADE" => "CASCADE",
        "SET NULL" => "SET NULL",
        "SET DEFAULT" => "SET DEFAULT",
        "RESTRICT" => "RESTRICT",
        _ => "NO ACTION",
    }
}

/// First 8 hex chars of a SHA-256, for stable short suffixes.
fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..8].to_string()
}
