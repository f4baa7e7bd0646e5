use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanOrderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workbook error: {0}")]
    Workbook(#[from] crate::workbook::WorkbookError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Catalog import error: {0}")]
    CatalogImport(#[from] crate::catalog::CatalogImportError),

    #[error("Order update error: {0}")]
    OrderUpdate(#[from] crate::order::OrderUpdateError),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("No database path configured and no home directory found")]
    NoDatabasePath,
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Failed to spawn worker: {0}")]
    SpawnFailed(String),

    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Sweep failed: {0}")]
    SweepFailed(String),
}

pub type Result<T> = std::result::Result<T, ScanOrderError>;
