//! Config files on disk, through to the pipeline settings they produce.

mod common;

use std::time::Duration;

use common::ConfigBuilder;
use scanorder::config::{load_config, resolve_database_path};
use scanorder::{ConfigError, PipelineConfig, SheetNames};

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scan.db");
    let json = ConfigBuilder::new()
        .database(db_path.to_str().unwrap())
        .duplicate_window_secs(45)
        .lock_timeout_ms(1200)
        .worker_count(3)
        .max_error_retries(2)
        .to_json();
    let path = dir.path().join("scanorder.json");
    std::fs::write(&path, json).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.worker_count, 3);
    assert_eq!(config.sweep.max_error_retries, 2);
    assert_eq!(resolve_database_path(&config).unwrap(), db_path);

    let pipeline = PipelineConfig::from_config(&config);
    assert_eq!(pipeline.duplicate_window_secs, 45);
    assert_eq!(pipeline.lock_timeout, Duration::from_millis(1200));
    assert_eq!(pipeline.sheets, SheetNames::default());
    assert_eq!(pipeline.requested_by, "external-trigger");
}

#[test]
fn test_custom_sheet_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanorder.json");
    std::fs::write(
        &path,
        r#"{
            "version": "1.0",
            "sheets": { "scans": "Scans", "catalog": "Catalog" }
        }"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.sheets.scans, "Scans");
    assert_eq!(config.sheets.catalog, "Catalog");
    assert_eq!(config.sheets.orders, "Pedidos");
}

#[test]
fn test_unknown_fields_fail_schema_validation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanorder.json");
    std::fs::write(&path, r#"{ "version": "1.0", "dupWindow": 5 }"#).unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::SchemaValidation { .. }));
}

#[test]
fn test_zero_lock_timeout_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scanorder.json");
    std::fs::write(&path, ConfigBuilder::new().lock_timeout_ms(0).to_json()).unwrap();
    assert!(load_config(&path).is_err());
}
