//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

const SOURCE_TYPES: &[&str] = &["mysql", "mariadb"];
const TARGET_TYPES: &[&str] = &["postgres", "postgresql", "pg"];
const SSL_MODES: &[&str] = &["disable", "require", "verify-ca", "verify-full"];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.host.is_empty() {
        return Err(MigrateError::Config("source.host is required".into()));
    }
    if config.source.database.is_empty() {
        return Err(MigrateError::Config("source.database is required".into()));
    }
    if config.source.username.is_empty() {
        return Err(MigrateError::Config("source.username is required".into()));
    }
    if !SOURCE_TYPES.contains(&config.source.r#type.to_lowercase().as_str()) {
        return Err(MigrateError::Config(format!(
            "source.type must be one of {:?}, got '{}'",
            SOURCE_TYPES, config.source.r#type
        )));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.username.is_empty() {
        return Err(MigrateError::Config("target.username is required".into()));
    }
    if !TARGET_TYPES.contains(&config.target.r#type.to_lowercase().as_str()) {
        return Err(MigrateError::Config(format!(
            "target.type must be one of {:?}, got '{}'",
            TARGET_TYPES, config.target.r#type
        )));
    }
    if !SSL_MODES.contains(&config.target.ssl_mode.to_lowercase().as_str()) {
        return Err(MigrateError::Config(format!(
            "target.ssl_mode must be one of {:?}, got '{}'",
            SSL_MODES, config.target.ssl_mode
        )));
    }

    // Options validation
    if config.options.batch_size == 0 {
        return Err(MigrateError::Config(
            "options.batch_size must be at least 1".into(),
        ));
    }
    if config.options.workers == 0 {
        return Err(MigrateError::Config(
            "options.workers must be at least 1".into(),
        ));
    }
    if config.options.commit_every == 0 {
        return Err(MigrateError::Config(
            "options.commit_every must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MigrationOptions, SourceConfig, TargetConfig};

    fn valid_config() -> Config {
        Config {
            source: SourceConfig {
                r#type: "mysql".to_string(),
                host: "localhost".to_string(),
                port: 3306,
                username: "root".to_string(),
                password: "password".to_string(),
                database: "source_db".to_string(),
                options: Default::default(),
            },
            target: TargetConfig {
                r#type: "postgres".to_string(),
                host: "localhost".to_string(),
                port: 5432,
                username: "postgres".to_string(),
                password: "password".to_string(),
                database: "target_db".to_string(),
                schema: "public".to_string(),
                ssl_mode: "disable".to_string(),
                options: Default::default(),
            },
            options: MigrationOptions::default(),
            type_mappings: Default::default(),
            logging: Default::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_source_host() {
        let mut config = valid_config();
        config.source.host = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_unknown_engine_tags() {
        let mut config = valid_config();
        config.source.r#type = "oracle".to_string();
        assert!(validate(&config).is_err());

        let mut config = valid_config();
        config.target.r#type = "mysql".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_ssl_mode() {
        let mut config = valid_config();
        config.target.ssl_mode = "maybe".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = valid_config();
        config.options.batch_size = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = valid_config();
        config.options.workers = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_source_config_debug_redacts_password() {
        let mut config = valid_config();
        config.source.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.source);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }

    #[test]
    fn test_target_config_debug_redacts_password() {
        let mut config = valid_config();
        config.target.password = "super_secret_456".to_string();
        let debug_output = format!("{:?}", config.target);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_456"));
    }
}
