//! Centralized identifier validation and quoting for SQL injection prevention.
//!
//! SQL identifiers (table names, column names, schema names) cannot be passed
//! as parameters in prepared statements - only data values can. To construct
//! dynamic SQL safely we validate identifiers for suspicious content, apply
//! engine-specific quoting, and escape the quote character inside the quotes.

use crate::error::{MigrateError, Result};

/// Maximum identifier length in bytes.
/// - PostgreSQL: 63 bytes (longer names are truncated, not rejected)
/// - MySQL: 64 characters, which can exceed 64 bytes when multibyte
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Quote a PostgreSQL identifier.
///
/// Escapes double quotes by doubling them and wraps in double quotes.
pub fn quote_pg(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
pub fn quote_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Qualify a PostgreSQL table name with schema.
pub fn qualify_pg(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_pg(schema), quote_pg(table))
}

/// Qualify a MySQL table name with schema/database.
pub fn qualify_mysql(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_mysql(schema), quote_mysql(table))
}

/// Quote a SQL string literal with `''` escaping.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("my_table").is_ok());
        assert!(validate_identifier("Table123").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(validate_identifier(&long_name).is_err());
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(validate_identifier(&max_name).is_ok());
    }

    #[test]
    fn test_quote_pg() {
        assert_eq!(quote_pg("users"), "\"users\"");
        assert_eq!(quote_pg("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_quote_pg_sql_injection_safely_quoted() {
        assert_eq!(
            quote_pg("Robert'); DROP TABLE Students;--"),
            "\"Robert'); DROP TABLE Students;--\""
        );
    }

    #[test]
    fn test_quote_mysql() {
        assert_eq!(quote_mysql("users"), "`users`");
        assert_eq!(quote_mysql("table`name"), "`table``name`");
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify_pg("public", "users"), "\"public\".\"users\"");
        assert_eq!(qualify_mysql("mydb", "users"), "`mydb`.`users`");
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(quote_literal("plain"), "'plain'");
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
    }
}
