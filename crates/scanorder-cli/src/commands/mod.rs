//! Subcommand implementations and the state they share.

pub mod catalog;
pub mod edit;
pub mod init;
pub mod order;
pub mod scan;
pub mod serve;
pub mod sweep;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scanorder::config::{load_config, resolve_database_path, Config};
use scanorder::{
    Clock, Database, IntakeCursor, OrderTableLock, PipelineConfig, ScanPipeline, ScanResult,
    Sweeper, SystemClock,
};

/// Everything a command needs: resolved config and an open workbook.
pub struct AppContext {
    pub config: Config,
    pub database_path: PathBuf,
    pub workbook: Arc<Database>,
    pub lock: OrderTableLock,
    pub clock: Arc<dyn Clock>,
}

impl AppContext {
    pub fn open(config_path: Option<&Path>, database: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::default(),
        };
        if let Some(database) = database {
            config.database = Some(database.to_string_lossy().into_owned());
        }

        let database_path = resolve_database_path(&config)
            .context("Database path is required. Set --database or SCANORDER_DATABASE")?;
        let workbook = Database::open(&database_path)
            .with_context(|| format!("Failed to open database {}", database_path.display()))?;

        Ok(Self {
            config,
            database_path,
            workbook: Arc::new(workbook),
            lock: OrderTableLock::new(),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.config.lock_timeout_ms)
    }

    pub fn pipeline(&self) -> ScanPipeline {
        ScanPipeline::new(
            Arc::new(PipelineConfig::from_config(&self.config)),
            self.workbook.clone(),
            self.lock.clone(),
            self.clock.clone(),
            IntakeCursor::new(),
        )
    }

    pub fn sweeper(&self) -> Sweeper {
        Sweeper::new(
            self.workbook.clone(),
            self.config.sheets.clone(),
            self.clock.clone(),
            self.config.sweep.max_error_retries,
        )
    }
}

/// One line per processed scan.
pub fn print_result(result: &ScanResult) {
    let status = result
        .status()
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| "SKIPPED".to_string());
    match result.order_id() {
        Some(order_id) => println!(
            "row {:>4}  {:<8} {:<12} {}  [{}]",
            result.row,
            status,
            result.serial.trim(),
            result.message(),
            order_id
        ),
        None => println!(
            "row {:>4}  {:<8} {:<12} {}",
            result.row,
            status,
            result.serial.trim(),
            result.message()
        ),
    }
    for warning in &result.warnings {
        println!("          warning: {}", warning);
    }
}
