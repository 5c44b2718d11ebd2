//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

impl Config {
    /// Load configuration from a file.
    ///
    /// Automatically detects the format based on file extension:
    /// - `.json` files are parsed as JSON
    /// - `.yaml` or `.yml` files are parsed as YAML
    /// - Other extensions default to YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| MigrateError::Config(format!("Failed to parse JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration (passwords excluded by
    /// serialization) for change detection in wrappers.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_YAML: &str = r#"
source:
  type: mysql
  host: localhost
  port: 3306
  database: shop
  username: root
  password: password

target:
  type: postgres
  host: localhost
  port: 5432
  database: shop_pg
  username: postgres
  password: password
  schema: public
  ssl_mode: disable

options:
  tables: ["user_*"]
  exclude_tables: ["*_log"]
  batch_size: 500
  workers: 2
  drop_target: true
  migrate_indexes: true
  migrate_foreign_keys: true
  where_clauses:
    users: "active = 1"

type_mappings:
  enum: varchar(32)

logging:
  level: debug
"#;

    const VALID_JSON: &str = r#"{
  "source": {
    "type": "mysql",
    "host": "localhost",
    "port": 3306,
    "database": "shop",
    "username": "root",
    "password": "password"
  },
  "target": {
    "type": "postgres",
    "host": "localhost",
    "port": 5432,
    "database": "shop_pg",
    "username": "postgres",
    "password": "password",
    "schema": "public",
    "ssl_mode": "disable"
  },
  "options": {
    "batch_size": 500,
    "workers": 2
  }
}"#;

    #[test]
    fn test_from_yaml_valid() {
        let config = Config::from_yaml(VALID_YAML).unwrap();
        assert_eq!(config.source.host, "localhost");
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.target.database, "shop_pg");
        assert_eq!(config.options.batch_size, 500);
        assert_eq!(config.options.workers, 2);
        assert_eq!(config.options.tables, vec!["user_*"]);
        assert_eq!(config.options.exclude_tables, vec!["*_log"]);
        assert_eq!(
            config.options.where_clause_for("users"),
            Some("active = 1")
        );
        assert_eq!(
            config.type_mappings.get("enum").map(|s| s.as_str()),
            Some("varchar(32)")
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_yaml_defaults_applied() {
        let minimal = r#"
source:
  host: localhost
  database: shop
  username: root
  password: p
target:
  host: localhost
  database: shop_pg
  username: postgres
  password: p
"#;
        let config = Config::from_yaml(minimal).unwrap();
        assert_eq!(config.source.r#type, "mysql");
        assert_eq!(config.source.port, 3306);
        assert_eq!(config.target.port, 5432);
        assert_eq!(config.target.schema, "public");
        assert_eq!(config.options.batch_size, 1000);
        assert_eq!(config.options.workers, 4);
        assert!(config.options.drop_target);
        assert!(config.options.migrate_indexes);
        assert!(config.options.migrate_foreign_keys);
        assert_eq!(config.options.commit_every, 1);
        assert!(config.options.indexes_after_data);
    }

    #[test]
    fn test_user_alias_accepted() {
        let yaml = r#"
source:
  host: localhost
  database: shop
  user: root
  password: p
target:
  host: localhost
  database: shop_pg
  user: postgres
  password: p
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.source.username, "root");
        assert_eq!(config.target.username, "postgres");
    }

    #[test]
    fn test_from_json_valid() {
        let config = Config::from_json(VALID_JSON).unwrap();
        assert_eq!(config.source.database, "shop");
        assert_eq!(config.options.batch_size, 500);
    }

    #[test]
    fn test_from_json_invalid_syntax() {
        let result = Config::from_json(r#"{ "source": { invalid json }"#);
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_load_json_extension() {
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(VALID_JSON.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.source.database, "shop");
    }

    #[test]
    fn test_load_yaml_extension() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(VALID_YAML.as_bytes()).unwrap();
        file.flush().unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.source.database, "shop");
    }

    #[test]
    fn test_hash_excludes_password() {
        let mut config = Config::from_yaml(VALID_YAML).unwrap();
        let h1 = config.hash();
        config.source.password = "different".to_string();
        let h2 = config.hash();
        assert_eq!(h1, h2);

        config.options.batch_size = 9999;
        assert_ne!(h1, config.hash());
    }
}
