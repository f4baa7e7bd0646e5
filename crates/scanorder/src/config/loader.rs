use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Where the workbook database lives: the configured path with `~`
/// expanded, or `~/.scanorder/data/scanorder.db`.
pub fn resolve_database_path(config: &Config) -> Result<PathBuf, ConfigError> {
    match config.database.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => expand_home(path),
        _ => crate::db::default_database_path().ok_or(ConfigError::NoDatabasePath),
    }
}

fn expand_home(path: &str) -> Result<PathBuf, ConfigError> {
    if path == "~" {
        return dirs::home_dir().ok_or(ConfigError::NoDatabasePath);
    }
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or(ConfigError::NoDatabasePath),
        None => Ok(PathBuf::from(path)),
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let sheets = &config.sheets;
    let mut seen = HashSet::new();
    for (role, name) in [
        ("scans", &sheets.scans),
        ("catalog", &sheets.catalog),
        ("orders", &sheets.orders),
        ("items", &sheets.items),
    ] {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: format!("Sheet name for '{}' must not be empty", role),
            });
        }
        if !seen.insert(name.trim()) {
            return Err(ConfigError::Validation {
                message: format!("Sheet '{}' is used for more than one role", name),
            });
        }
    }

    if config.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "workerCount must be at least 1".to_string(),
        });
    }

    if config.lock_timeout_ms == 0 {
        return Err(ConfigError::Validation {
            message: "lockTimeoutMs must be greater than 0".to_string(),
        });
    }

    if config.sweep.enabled && config.sweep.interval_secs == 0 {
        return Err(ConfigError::Validation {
            message: "sweep.intervalSecs must be greater than 0".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let config = load_config_from_str(r#"{ "version": "1.0" }"#).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.sheets.scans, "Leituras");
        assert_eq!(config.sheets.catalog, "paco");
        assert_eq!(config.sheets.orders, "Pedidos");
        assert_eq!(config.sheets.items, "Itens");
        assert_eq!(config.duplicate_window_secs, 10);
        assert_eq!(config.lock_timeout_ms, 5000);
        assert_eq!(config.requested_by, "external-trigger");
        assert_eq!(config.notes, "auto-generated");
        assert!(config.worker_count >= 1);
        assert!(config.sweep.enabled);
        assert_eq!(config.sweep.interval_secs, 60);
        assert_eq!(config.sweep.max_error_retries, 0);
        assert!(config.database.is_none());
    }

    #[test]
    fn test_load_full_config() {
        let config_json = r#"
        {
            "version": "1.0",
            "database": "/var/lib/scanorder/orders.db",
            "sheets": {
                "scans": "Scans",
                "catalog": "Catalog",
                "orders": "Orders",
                "items": "Items"
            },
            "duplicateWindowSecs": 30,
            "workerCount": 3,
            "lockTimeoutMs": 250,
            "requestedBy": "line-2",
            "notes": "night shift",
            "sweep": {
                "enabled": false,
                "intervalSecs": 15,
                "maxErrorRetries": 2
            }
        }
        "#;

        let config = load_config_from_str(config_json).unwrap();
        assert_eq!(config.sheets.orders, "Orders");
        assert_eq!(config.duplicate_window_secs, 30);
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(config.requested_by, "line-2");
        assert!(!config.sweep.enabled);
        assert_eq!(config.sweep.max_error_retries, 2);
        assert_eq!(
            resolve_database_path(&config).unwrap(),
            PathBuf::from("/var/lib/scanorder/orders.db")
        );
    }

    #[test]
    fn test_invalid_version() {
        let result = load_config_from_str(r#"{ "version": "2.0" }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_version_fails_schema() {
        let result = load_config_from_str(r#"{ "workerCount": 2 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_negative_window_fails_schema() {
        let result = load_config_from_str(r#"{ "version": "1.0", "duplicateWindowSecs": -1 }"#);
        assert!(matches!(result, Err(ConfigError::SchemaValidation { .. })));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = load_config_from_str(r#"{ "version": "1.0", "workerCount": 0 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_sheet_names_rejected() {
        let config_json = r#"
        {
            "version": "1.0",
            "sheets": { "scans": "Pedidos" }
        }
        "#;
        let err = load_config_from_str(config_json).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert!(err.to_string().contains("Pedidos"));
    }

    #[test]
    fn test_blank_sheet_name_rejected() {
        let config_json = r#"{ "version": "1.0", "sheets": { "items": "  " } }"#;
        assert!(load_config_from_str(config_json).is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = load_config_from_str("{ not json");
        assert!(matches!(result, Err(ConfigError::ParseJson(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanorder.json");
        std::fs::write(&path, r#"{ "version": "1.0", "duplicateWindowSecs": 0 }"#).unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.duplicate_window_secs, 0);

        let missing = load_config(dir.path().join("absent.json"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_resolve_database_path_expands_home() {
        let config = Config {
            database: Some("~/orders/scan.db".to_string()),
            ..Config::default()
        };
        let path = resolve_database_path(&config).unwrap();
        assert!(path.ends_with("orders/scan.db"));
        assert!(!path.to_string_lossy().starts_with('~'));

        let default = resolve_database_path(&Config::default()).unwrap();
        assert!(default.ends_with("scanorder.db"));
    }
}
