//! Type mapping between MySQL/MariaDB and PostgreSQL.
//!
//! Source types are first classified into a [`LogicalType`] - an
//! engine-neutral intermediate form - and then rendered as a PostgreSQL type
//! token. Adding an engine means adding a classifier or renderer, not
//! patching call sites.
//!
//! A user-supplied override table keyed by source type token (with optional
//! modifier, e.g. `"enum"` or `"char(36)"`) is consulted before the
//! defaults. Types that classify as [`LogicalType::Unknown`] and have no
//! override become a fatal pre-flight error during schema translation.

use std::collections::BTreeMap;
use std::fmt;

use crate::config::{EnumMode, ZeroDatePolicy};
use crate::core::identifier::quote_literal;
use crate::core::schema::{Column, DefaultValue};

/// Engine-neutral column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalType {
    /// 8-bit integer (MySQL TINYINT). PostgreSQL has no 1-byte integer,
    /// so this widens to SMALLINT at the target.
    Int8,
    /// 16-bit integer.
    Int16,
    /// 32-bit integer (INT, MEDIUMINT).
    Int32,
    /// 64-bit integer.
    Int64,
    /// Exact decimal with precision and scale.
    Decimal { precision: u32, scale: u32 },
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// Boolean (TINYINT(1), BIT(1)).
    Bool,
    /// Fixed-length character string.
    Char(u32),
    /// Variable-length character string.
    Varchar(u32),
    /// Unbounded text (TEXT, MEDIUMTEXT, LONGTEXT).
    Text,
    /// Binary data (BLOB, VARBINARY, BINARY).
    Bytes,
    /// Date only.
    Date,
    /// Time only.
    Time,
    /// Date and time without timezone (DATETIME).
    DateTime,
    /// Date and time with timezone semantics (MySQL TIMESTAMP is stored
    /// in UTC and converted on read).
    TimestampTz,
    /// JSON document.
    Json,
    /// Enumerated string values.
    Enum(Vec<String>),
    /// UUID (MariaDB native uuid; CHAR(36)/BINARY(16) only via override).
    Uuid,
    /// Unrecognized source type; aborts translation unless overridden.
    Unknown(String),
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Int8 => write!(f, "int8"),
            LogicalType::Int16 => write!(f, "int16"),
            LogicalType::Int32 => write!(f, "int32"),
            LogicalType::Int64 => write!(f, "int64"),
            LogicalType::Decimal { precision, scale } => {
                write!(f, "decimal({},{})", precision, scale)
            }
            LogicalType::Float32 => write!(f, "float32"),
            LogicalType::Float64 => write!(f, "float64"),
            LogicalType::Bool => write!(f, "bool"),
            LogicalType::Char(n) => write!(f, "char({})", n),
            LogicalType::Varchar(n) => write!(f, "varchar({})", n),
            LogicalType::Text => write!(f, "text"),
            LogicalType::Bytes => write!(f, "bytes"),
            LogicalType::Date => write!(f, "date"),
            LogicalType::Time => write!(f, "time"),
            LogicalType::DateTime => write!(f, "datetime"),
            LogicalType::TimestampTz => write!(f, "timestamp_tz"),
            LogicalType::Json => write!(f, "json"),
            LogicalType::Enum(_) => write!(f, "enum"),
            LogicalType::Uuid => write!(f, "uuid"),
            LogicalType::Unknown(name) => write!(f, "unknown({})", name),
        }
    }
}

/// Result of mapping a type to the target engine.
#[derive(Debug, Clone)]
pub struct TypeMapping {
    /// Target type token (e.g., "varchar(255)", "bigint").
    pub target_type: String,
    /// Whether this mapping loses data or functionality.
    pub is_lossy: bool,
    /// Warning message for lossy mappings.
    pub warning: Option<String>,
}

impl TypeMapping {
    /// Create a lossless type mapping.
    pub fn lossless(target_type: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: false,
            warning: None,
        }
    }

    /// Create a lossy type mapping with a warning.
    pub fn lossy(target_type: impl Into<String>, warning: impl Into<String>) -> Self {
        Self {
            target_type: target_type.into(),
            is_lossy: true,
            warning: Some(warning.into()),
        }
    }
}

/// Result of mapping a whole column.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    /// Column name (same as source).
    pub name: String,
    /// The classified logical type; also drives row decoding.
    pub kind: LogicalType,
    /// Target type token. `None` means the column is unmapped and schema
    /// translation must abort.
    pub target_type: Option<String>,
    /// Warning for lossy or overridden mappings.
    pub warning: Option<String>,
}

/// User-supplied override table consulted before the default mappings.
///
/// Keys are source type tokens, either bare (`"enum"`, `"tinyint"`) or with
/// modifier (`"char(36)"`, `"binary(16)"`). Matching is case-insensitive;
/// the modified form wins over the bare token.
#[derive(Debug, Clone, Default)]
pub struct TypeOverrides {
    map: BTreeMap<String, String>,
}

impl TypeOverrides {
    /// Build from a config `type_mappings` section.
    pub fn new(mappings: &BTreeMap<String, String>) -> Self {
        let map = mappings
            .iter()
            .map(|(k, v)| (normalize_token(k), v.trim().to_string()))
            .collect();
        Self { map }
    }

    /// Look up an override for a column: full column type first
    /// (`char(36)`), then the bare base token (`char`).
    pub fn lookup(&self, col: &Column) -> Option<&str> {
        self.map
            .get(&normalize_token(&col.column_type))
            .or_else(|| self.map.get(&normalize_token(&col.data_type)))
            .map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn normalize_token(token: &str) -> String {
    token.trim().to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Classify a MySQL column into its logical type.
///
/// Uses both the base `DATA_TYPE` token and the full `COLUMN_TYPE` text,
/// since modifiers like `(1)`, `unsigned`, and enum value lists only appear
/// in the latter.
pub fn classify_mysql(col: &Column) -> LogicalType {
    let data_type = col.data_type.to_lowercase();
    let column_type = col.column_type.to_lowercase();
    let unsigned = col.is_unsigned();

    match data_type.as_str() {
        "tinyint" => {
            if column_type.starts_with("tinyint(1)") {
                LogicalType::Bool
            } else if unsigned {
                LogicalType::Int16
            } else {
                LogicalType::Int8
            }
        }
        "smallint" => {
            if unsigned {
                LogicalType::Int32
            } else {
                LogicalType::Int16
            }
        }
        "mediumint" | "int" | "integer" => {
            if unsigned {
                LogicalType::Int64
            } else {
                LogicalType::Int32
            }
        }
        "bigint" => {
            if unsigned {
                // No wider integer at the target; numeric(20,0) holds the
                // full unsigned 64-bit range.
                LogicalType::Decimal {
                    precision: 20,
                    scale: 0,
                }
            } else {
                LogicalType::Int64
            }
        }
        "decimal" | "numeric" => LogicalType::Decimal {
            precision: col.precision.max(0) as u32,
            scale: col.scale.max(0) as u32,
        },
        "float" => LogicalType::Float32,
        "double" | "real" => LogicalType::Float64,
        "bit" => {
            if column_type.starts_with("bit(1)") {
                LogicalType::Bool
            } else {
                LogicalType::Bytes
            }
        }
        "char" => LogicalType::Char(col.max_length.max(1) as u32),
        "varchar" => {
            if col.max_length > 0 {
                LogicalType::Varchar(col.max_length as u32)
            } else {
                LogicalType::Text
            }
        }
        "tinytext" | "text" | "mediumtext" | "longtext" => LogicalType::Text,
        "binary" | "varbinary" | "blob" | "tinyblob" | "mediumblob" | "longblob" => {
            LogicalType::Bytes
        }
        "date" => LogicalType::Date,
        "time" => LogicalType::Time,
        "datetime" => LogicalType::DateTime,
        "timestamp" => LogicalType::TimestampTz,
        "year" => LogicalType::Int32,
        "json" => LogicalType::Json,
        "enum" => LogicalType::Enum(parse_value_list(&col.column_type)),
        // SET degrades to a comma-joined string column.
        "set" => LogicalType::Varchar(255),
        "uuid" => LogicalType::Uuid,
        other => LogicalType::Unknown(other.to_string()),
    }
}

/// Parse the quoted value list out of `enum('a','b','c')` / `set(...)`.
fn parse_value_list(column_type: &str) -> Vec<String> {
    let Some(start) = column_type.find('(') else {
        return Vec::new();
    };
    let Some(end) = column_type.rfind(')') else {
        return Vec::new();
    };
    let body = &column_type[start + 1..end];

    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_quote => in_quote = true,
            '\'' if in_quote => {
                // Doubled quote is an escaped quote inside the value.
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    current.push('\'');
                } else {
                    in_quote = false;
                    values.push(std::mem::take(&mut current));
                }
            }
            _ if in_quote => current.push(c),
            _ => {}
        }
    }

    values
}

/// Render a logical type as a PostgreSQL type token.
///
/// Returns `None` for [`LogicalType::Unknown`]; the schema translator turns
/// that into a batched pre-flight error.
pub fn postgres_type(kind: &LogicalType, enum_mode: EnumMode) -> Option<TypeMapping> {
    let mapping = match kind {
        LogicalType::Int8 | LogicalType::Int16 => TypeMapping::lossless("smallint"),
        LogicalType::Int32 => TypeMapping::lossless("integer"),
        LogicalType::Int64 => TypeMapping::lossless("bigint"),
        LogicalType::Decimal {
            precision: 0,
            scale: _,
        } => TypeMapping::lossless("numeric"),
        LogicalType::Decimal { precision, scale } => {
            TypeMapping::lossless(format!("numeric({},{})", precision, scale))
        }
        LogicalType::Float32 => TypeMapping::lossless("real"),
        LogicalType::Float64 => TypeMapping::lossless("double precision"),
        LogicalType::Bool => TypeMapping::lossless("boolean"),
        LogicalType::Char(n) => TypeMapping::lossless(format!("char({})", (*n).max(1))),
        LogicalType::Varchar(n) => TypeMapping::lossless(format!("varchar({})", n)),
        LogicalType::Text => TypeMapping::lossless("text"),
        LogicalType::Bytes => TypeMapping::lossless("bytea"),
        LogicalType::Date => TypeMapping::lossless("date"),
        LogicalType::Time => TypeMapping::lossless("time"),
        LogicalType::DateTime => TypeMapping::lossless("timestamp"),
        LogicalType::TimestampTz => TypeMapping::lossless("timestamptz"),
        LogicalType::Json => TypeMapping::lossless("jsonb"),
        LogicalType::Enum(values) => match enum_mode {
            EnumMode::Varchar => TypeMapping::lossy(
                "varchar(255)",
                format!(
                    "enum({}) stored as varchar with CHECK constraint",
                    values.len()
                ),
            ),
            // The translator substitutes the generated type name; this
            // placeholder never reaches DDL.
            EnumMode::Native => TypeMapping::lossless("text"),
        },
        LogicalType::Uuid => TypeMapping::lossless("uuid"),
        LogicalType::Unknown(_) => return None,
    };
    Some(mapping)
}

/// Map a whole column, consulting overrides before the defaults.
pub fn map_column(col: &Column, overrides: &TypeOverrides, enum_mode: EnumMode) -> ColumnMapping {
    let kind = classify_mysql(col);

    if let Some(target) = overrides.lookup(col) {
        return ColumnMapping {
            name: col.name.clone(),
            kind,
            target_type: Some(target.to_string()),
            warning: None,
        };
    }

    match postgres_type(&kind, enum_mode) {
        Some(mapping) => {
            let warning = if col.data_type.eq_ignore_ascii_case("set") {
                Some("SET stored as comma-joined varchar; set operations unavailable".to_string())
            } else {
                mapping.warning
            };
            ColumnMapping {
                name: col.name.clone(),
                kind,
                target_type: Some(mapping.target_type),
                warning,
            }
        }
        None => ColumnMapping {
            name: col.name.clone(),
            kind,
            target_type: None,
            warning: None,
        },
    }
}

/// Translate a source default expression into a target DEFAULT clause.
///
/// Returns `(default_sql, warning)`. A `None` default means the clause is
/// dropped (NULL defaults, zero dates under the NULL policy, unsupported
/// engine functions).
pub fn translate_default(
    default: &DefaultValue,
    kind: &LogicalType,
    policy: ZeroDatePolicy,
) -> (Option<String>, Option<String>) {
    let expr = default.expr.trim();

    if expr.is_empty() || expr.eq_ignore_ascii_case("null") {
        return (None, None);
    }

    // CURRENT_TIMESTAMP / NOW(), with or without fractional precision.
    let lower = expr.to_lowercase();
    if lower.starts_with("current_timestamp") || lower.starts_with("now(") {
        return (Some("CURRENT_TIMESTAMP".to_string()), None);
    }

    // Zero dates are invalid at the target.
    if expr.starts_with("0000-00-00") {
        return match policy {
            ZeroDatePolicy::Null => (
                None,
                Some(format!(
                    "zero date default '{}' translated to NULL",
                    expr
                )),
            ),
            ZeroDatePolicy::Epoch => {
                let substitute = match kind {
                    LogicalType::Date => "'1970-01-01'",
                    _ => "'1970-01-01 00:00:00'",
                };
                (
                    Some(substitute.to_string()),
                    Some(format!(
                        "zero date default '{}' translated to epoch",
                        expr
                    )),
                )
            }
        };
    }

    // Other engine-function defaults have no portable translation.
    if default.is_function {
        return (
            None,
            Some(format!("engine function default '{}' dropped", expr)),
        );
    }

    match kind {
        LogicalType::Bool => {
            let value = match lower.as_str() {
                "1" | "b'1'" | "true" => "TRUE",
                "0" | "b'0'" | "false" => "FALSE",
                _ => return (Some(quote_literal(expr)), None),
            };
            (Some(value.to_string()), None)
        }
        LogicalType::Int8
        | LogicalType::Int16
        | LogicalType::Int32
        | LogicalType::Int64
        | LogicalType::Decimal { .. }
        | LogicalType::Float32
        | LogicalType::Float64 => {
            if expr.parse::<f64>().is_ok() {
                (Some(expr.to_string()), None)
            } else {
                (Some(quote_literal(expr)), None)
            }
        }
        // Literal strings, dates, and everything else pass through re-quoted
        // for the target.
        _ => (Some(quote_literal(expr)), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(data_type: &str, column_type: &str) -> Column {
        Column {
            name: "c".to_string(),
            data_type: data_type.to_string(),
            column_type: column_type.to_string(),
            max_length: 0,
            precision: 0,
            scale: 0,
            is_nullable: true,
            is_identity: false,
            ordinal: 0,
            default: None,
            comment: String::new(),
        }
    }

    fn pg(kind: &LogicalType) -> String {
        postgres_type(kind, EnumMode::Varchar).unwrap().target_type
    }

    #[test]
    fn test_classify_integers() {
        assert_eq!(classify_mysql(&col("tinyint", "tinyint(4)")), LogicalType::Int8);
        assert_eq!(classify_mysql(&col("smallint", "smallint(6)")), LogicalType::Int16);
        assert_eq!(classify_mysql(&col("mediumint", "mediumint(9)")), LogicalType::Int32);
        assert_eq!(classify_mysql(&col("int", "int(11)")), LogicalType::Int32);
        assert_eq!(classify_mysql(&col("bigint", "bigint(20)")), LogicalType::Int64);
    }

    #[test]
    fn test_classify_unsigned_promotion() {
        assert_eq!(
            classify_mysql(&col("int", "int(10) unsigned")),
            LogicalType::Int64
        );
        assert_eq!(
            classify_mysql(&col("tinyint", "tinyint(3) unsigned")),
            LogicalType::Int16
        );
        assert_eq!(
            classify_mysql(&col("bigint", "bigint(20) unsigned")),
            LogicalType::Decimal {
                precision: 20,
                scale: 0
            }
        );
    }

    #[test]
    fn test_classify_bool() {
        assert_eq!(classify_mysql(&col("tinyint", "tinyint(1)")), LogicalType::Bool);
        assert_eq!(classify_mysql(&col("bit", "bit(1)")), LogicalType::Bool);
        assert_eq!(classify_mysql(&col("bit", "bit(8)")), LogicalType::Bytes);
    }

    #[test]
    fn test_classify_strings() {
        let mut c = col("varchar", "varchar(255)");
        c.max_length = 255;
        assert_eq!(classify_mysql(&c), LogicalType::Varchar(255));

        let mut c = col("char", "char(36)");
        c.max_length = 36;
        assert_eq!(classify_mysql(&c), LogicalType::Char(36));

        assert_eq!(classify_mysql(&col("longtext", "longtext")), LogicalType::Text);
    }

    #[test]
    fn test_classify_temporal_and_special() {
        assert_eq!(classify_mysql(&col("datetime", "datetime")), LogicalType::DateTime);
        assert_eq!(
            classify_mysql(&col("timestamp", "timestamp")),
            LogicalType::TimestampTz
        );
        assert_eq!(classify_mysql(&col("year", "year(4)")), LogicalType::Int32);
        assert_eq!(classify_mysql(&col("json", "json")), LogicalType::Json);
        assert_eq!(classify_mysql(&col("uuid", "uuid")), LogicalType::Uuid);
        assert_eq!(
            classify_mysql(&col("geometry", "geometry")),
            LogicalType::Unknown("geometry".to_string())
        );
    }

    #[test]
    fn test_classify_enum_values() {
        let c = col("enum", "enum('a','b','it''s')");
        match classify_mysql(&c) {
            LogicalType::Enum(values) => {
                assert_eq!(values, vec!["a", "b", "it's"]);
            }
            other => panic!("expected enum, got {:?}", other),
        }
    }

    #[test]
    fn test_postgres_tokens() {
        assert_eq!(pg(&LogicalType::Int8), "smallint");
        assert_eq!(pg(&LogicalType::Int16), "smallint");
        assert_eq!(pg(&LogicalType::Int32), "integer");
        assert_eq!(pg(&LogicalType::Int64), "bigint");
        assert_eq!(
            pg(&LogicalType::Decimal {
                precision: 10,
                scale: 2
            }),
            "numeric(10,2)"
        );
        assert_eq!(pg(&LogicalType::Float32), "real");
        assert_eq!(pg(&LogicalType::Float64), "double precision");
        assert_eq!(pg(&LogicalType::Bool), "boolean");
        assert_eq!(pg(&LogicalType::Char(36)), "char(36)");
        assert_eq!(pg(&LogicalType::Varchar(255)), "varchar(255)");
        assert_eq!(pg(&LogicalType::Text), "text");
        assert_eq!(pg(&LogicalType::Bytes), "bytea");
        assert_eq!(pg(&LogicalType::Date), "date");
        assert_eq!(pg(&LogicalType::Time), "time");
        assert_eq!(pg(&LogicalType::DateTime), "timestamp");
        assert_eq!(pg(&LogicalType::TimestampTz), "timestamptz");
        assert_eq!(pg(&LogicalType::Json), "jsonb");
        assert_eq!(pg(&LogicalType::Uuid), "uuid");
        assert!(postgres_type(&LogicalType::Unknown("geometry".into()), EnumMode::Varchar).is_none());
    }

    #[test]
    fn test_override_precedence() {
        let mut map = BTreeMap::new();
        map.insert("enum".to_string(), "varchar(32)".to_string());
        map.insert("char(36)".to_string(), "uuid".to_string());
        let overrides = TypeOverrides::new(&map);

        let c = col("enum", "enum('a','b','c')");
        let mapping = map_column(&c, &overrides, EnumMode::Varchar);
        assert_eq!(mapping.target_type.as_deref(), Some("varchar(32)"));

        let mut c = col("char", "char(36)");
        c.max_length = 36;
        let mapping = map_column(&c, &overrides, EnumMode::Varchar);
        assert_eq!(mapping.target_type.as_deref(), Some("uuid"));

        // Unmodified char is untouched by the char(36) override.
        let mut c = col("char", "char(10)");
        c.max_length = 10;
        let mapping = map_column(&c, &overrides, EnumMode::Varchar);
        assert_eq!(mapping.target_type.as_deref(), Some("char(10)"));
    }

    #[test]
    fn test_override_rescues_unknown() {
        let mut map = BTreeMap::new();
        map.insert("geometry".to_string(), "text".to_string());
        let overrides = TypeOverrides::new(&map);

        let mapping = map_column(&col("geometry", "geometry"), &overrides, EnumMode::Varchar);
        assert_eq!(mapping.target_type.as_deref(), Some("text"));

        let mapping = map_column(
            &col("geometry", "geometry"),
            &TypeOverrides::default(),
            EnumMode::Varchar,
        );
        assert!(mapping.target_type.is_none());
    }

    #[test]
    fn test_default_current_timestamp() {
        for expr in ["CURRENT_TIMESTAMP", "current_timestamp()", "now()", "CURRENT_TIMESTAMP(6)"] {
            let (sql, warn) = translate_default(
                &DefaultValue::function(expr),
                &LogicalType::DateTime,
                ZeroDatePolicy::Null,
            );
            assert_eq!(sql.as_deref(), Some("CURRENT_TIMESTAMP"), "expr: {}", expr);
            assert!(warn.is_none());
        }
    }

    #[test]
    fn test_default_zero_date_null_policy() {
        let (sql, warn) = translate_default(
            &DefaultValue::literal("0000-00-00 00:00:00"),
            &LogicalType::DateTime,
            ZeroDatePolicy::Null,
        );
        assert!(sql.is_none());
        assert!(warn.unwrap().contains("NULL"));
    }

    #[test]
    fn test_default_zero_date_epoch_policy() {
        let (sql, warn) = translate_default(
            &DefaultValue::literal("0000-00-00"),
            &LogicalType::Date,
            ZeroDatePolicy::Epoch,
        );
        assert_eq!(sql.as_deref(), Some("'1970-01-01'"));
        assert!(warn.is_some());
    }

    #[test]
    fn test_default_literals() {
        let (sql, _) = translate_default(
            &DefaultValue::literal("42"),
            &LogicalType::Int32,
            ZeroDatePolicy::Null,
        );
        assert_eq!(sql.as_deref(), Some("42"));

        let (sql, _) = translate_default(
            &DefaultValue::literal("it's"),
            &LogicalType::Varchar(10),
            ZeroDatePolicy::Null,
        );
        assert_eq!(sql.as_deref(), Some("'it''s'"));

        let (sql, _) = translate_default(
            &DefaultValue::literal("1"),
            &LogicalType::Bool,
            ZeroDatePolicy::Null,
        );
        assert_eq!(sql.as_deref(), Some("TRUE"));
    }

    #[test]
    fn test_default_unsupported_function_dropped() {
        let (sql, warn) = translate_default(
            &DefaultValue::function("uuid()"),
            &LogicalType::Char(36),
            ZeroDatePolicy::Null,
        );
        assert!(sql.is_none());
        assert!(warn.unwrap().contains("uuid()"));
    }
}
