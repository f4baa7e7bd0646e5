//! Test harness for isolated pipeline runs.
//!
//! Every harness owns a temp directory, a workbook (in memory or SQLite
//! inside that directory) and a `FixedClock`, so timing-sensitive behavior
//! is deterministic.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Duration;
use tempfile::TempDir;

use scanorder::clock::parse_timestamp;
use scanorder::order::{OrderFilter, OrderRow};
use scanorder::{
    Database, FixedClock, IntakeCursor, OrderQuery, OrderTableLock, PipelineConfig, ScanPipeline,
    ScanResult, ScanService, Sweeper, Workbook,
};

use super::builders::WorkbookBuilder;

/// Default "now" for every harness.
pub const T0: &str = "2026-03-02 09:00:00";

pub struct TestHarness {
    temp_dir: TempDir,
    pub workbook: Arc<dyn Workbook>,
    pub clock: Arc<FixedClock>,
    pub lock: OrderTableLock,
    pub config: PipelineConfig,
    service: ScanService,
}

impl TestHarness {
    /// In-memory workbook seeded from `builder`.
    pub fn new(builder: WorkbookBuilder) -> Self {
        Self::with_workbook(Arc::new(builder.build()), PipelineConfig::default())
    }

    /// SQLite workbook in the harness temp directory, seeded from `builder`.
    pub fn sqlite(builder: WorkbookBuilder) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("workbook.db")).expect("Failed to open db");
        builder.seed(&db);
        Self::build(temp_dir, Arc::new(db), PipelineConfig::default())
    }

    pub fn with_workbook(workbook: Arc<dyn Workbook>, config: PipelineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self::build(temp_dir, workbook, config)
    }

    fn build(temp_dir: TempDir, workbook: Arc<dyn Workbook>, config: PipelineConfig) -> Self {
        let clock = Arc::new(FixedClock::at(T0).expect("valid timestamp"));
        let lock = OrderTableLock::new();
        let pipeline = ScanPipeline::new(
            Arc::new(config.clone()),
            workbook.clone(),
            lock.clone(),
            clock.clone(),
            IntakeCursor::new(),
        );
        Self {
            temp_dir,
            workbook,
            clock,
            lock,
            config,
            service: ScanService::new(pipeline),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("workbook.db")
    }

    pub fn pipeline(&self) -> ScanPipeline {
        self.service.pipeline().clone()
    }

    pub fn service(&self) -> &ScanService {
        &self.service
    }

    pub fn sweeper(&self, max_error_retries: u32) -> Sweeper {
        Sweeper::new(
            self.workbook.clone(),
            self.config.sheets.clone(),
            self.clock.clone(),
            max_error_retries,
        )
    }

    pub fn set_time(&self, at: &str) {
        self.clock
            .set(parse_timestamp(at).expect("valid timestamp"));
    }

    pub fn advance_millis(&self, millis: i64) {
        self.clock.advance(Duration::milliseconds(millis));
    }

    /// Registers `serial` as a new scan row and processes it.
    pub fn scan(&self, serial: &str) -> ScanResult {
        self.service.register(serial).expect("Failed to register scan")
    }

    pub fn scan_at(&self, serial: &str, at: &str) -> ScanResult {
        self.set_time(at);
        self.scan(serial)
    }

    /// Cells of a scan row, padded to the five scan columns.
    pub fn scan_cells(&self, row: usize) -> Vec<String> {
        let snapshot = self
            .workbook
            .snapshot(&self.config.sheets.scans)
            .expect("snapshot")
            .expect("scan sheet");
        (0..5).map(|i| snapshot.cell(row, i).to_string()).collect()
    }

    pub fn orders(&self) -> Vec<OrderRow> {
        OrderQuery::new(self.workbook.clone(), self.config.sheets.clone())
            .list(&OrderFilter::default())
            .expect("Failed to list orders")
    }

    /// Line-item rows as stored.
    pub fn line_items(&self) -> Vec<Vec<String>> {
        match self
            .workbook
            .snapshot(&self.config.sheets.items)
            .expect("snapshot")
        {
            Some(snapshot) => snapshot
                .rows
                .into_iter()
                .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
                .collect(),
            None => Vec::new(),
        }
    }
}
