//! Builder patterns for creating test data programmatically.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use scanorder::config::{Config, SweepConfig};
use scanorder::workbook::layout::{catalog, items, orders, row_for_headers, scans};
use scanorder::workbook::{SheetSnapshot, Workbook, WorkbookError};
use scanorder::{MemoryWorkbook, SheetNames};

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Seeds the four sheets the pipeline works with.
pub struct WorkbookBuilder {
    sheets: SheetNames,
    catalog: Option<Vec<Vec<String>>>,
    orders: Option<Vec<Vec<String>>>,
    items: Option<Vec<Vec<String>>>,
    scans: Option<Vec<Vec<String>>>,
}

impl WorkbookBuilder {
    /// All four sheets present and empty.
    pub fn new() -> Self {
        Self {
            sheets: SheetNames::default(),
            catalog: Some(Vec::new()),
            orders: Some(Vec::new()),
            items: Some(Vec::new()),
            scans: Some(Vec::new()),
        }
    }

    pub fn sheets(mut self, sheets: SheetNames) -> Self {
        self.sheets = sheets;
        self
    }

    /// Adds a catalog row with the given serial and variant.
    pub fn item(self, serial: &str, variant: &str) -> Self {
        self.catalog_row(&[
            (catalog::SERIAL, serial),
            (catalog::MACHINE, "M-01"),
            (catalog::STATION, "P-07"),
            (catalog::COORDINATE, "A3"),
            (catalog::MODEL, "MX-200"),
            (catalog::WORK_ORDER, "OT-5521"),
            (catalog::VARIANT, variant),
            (catalog::BATCH, "PG-2"),
        ])
    }

    pub fn catalog_row(mut self, values: &[(&str, &str)]) -> Self {
        let row = build_row(&catalog::HEADERS, values);
        self.catalog.get_or_insert_with(Vec::new).push(row);
        self
    }

    /// Adds an existing order row.
    pub fn order(
        mut self,
        order_id: &str,
        created_at: &str,
        serial: &str,
        variant: &str,
        status: &str,
    ) -> Self {
        let row = build_row(
            &orders::HEADERS,
            &[
                (orders::ORDER_ID, order_id),
                (orders::CREATED_AT, created_at),
                (orders::SERIAL, serial),
                (orders::VARIANT, variant),
                (orders::STATUS, status),
                (orders::URGENT, "Não"),
            ],
        );
        self.orders.get_or_insert_with(Vec::new).push(row);
        self
    }

    /// Adds an existing line item.
    pub fn line_item(mut self, order_id: &str, serial: &str) -> Self {
        let row = build_row(
            &items::HEADERS,
            &[(items::ORDER_ID, order_id), (items::SERIAL, serial), (items::QUANTITY, "1")],
        );
        self.items.get_or_insert_with(Vec::new).push(row);
        self
    }

    /// Adds a scan row that has not been processed yet.
    pub fn pending_scan(self, serial: &str) -> Self {
        self.scan_row(&[(scans::SERIAL, serial)])
    }

    pub fn scan_row(mut self, values: &[(&str, &str)]) -> Self {
        let row = build_row(&scans::HEADERS, values);
        self.scans.get_or_insert_with(Vec::new).push(row);
        self
    }

    pub fn without_catalog(mut self) -> Self {
        self.catalog = None;
        self
    }

    pub fn without_orders(mut self) -> Self {
        self.orders = None;
        self
    }

    pub fn without_items(mut self) -> Self {
        self.items = None;
        self
    }

    /// Writes every configured sheet into `workbook`.
    pub fn seed(&self, workbook: &dyn Workbook) {
        let sheets = [
            (&self.sheets.scans, &scans::HEADERS[..], &self.scans),
            (&self.sheets.catalog, &catalog::HEADERS[..], &self.catalog),
            (&self.sheets.orders, &orders::HEADERS[..], &self.orders),
            (&self.sheets.items, &items::HEADERS[..], &self.items),
        ];
        for (name, header_names, rows) in sheets {
            if let Some(rows) = rows {
                workbook
                    .replace_rows(name, headers(header_names), rows.clone())
                    .expect("Failed to seed sheet");
            }
        }
    }

    pub fn build(&self) -> MemoryWorkbook {
        let workbook = MemoryWorkbook::new();
        self.seed(&workbook);
        workbook
    }
}

fn build_row(header_names: &[&str], values: &[(&str, &str)]) -> Vec<String> {
    let values: Vec<(&str, String)> = values.iter().map(|(k, v)| (*k, v.to_string())).collect();
    row_for_headers(&headers(header_names), &values)
}

/// Builder for creating `Config` instances.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config {
                worker_count: 2,
                sweep: SweepConfig {
                    enabled: false,
                    ..SweepConfig::default()
                },
                ..Config::default()
            },
        }
    }

    pub fn database(mut self, path: &str) -> Self {
        self.config.database = Some(path.to_string());
        self
    }

    pub fn duplicate_window_secs(mut self, secs: u64) -> Self {
        self.config.duplicate_window_secs = secs;
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.config.worker_count = count;
        self
    }

    pub fn lock_timeout_ms(mut self, ms: u64) -> Self {
        self.config.lock_timeout_ms = ms;
        self
    }

    pub fn max_error_retries(mut self, retries: u32) -> Self {
        self.config.sweep.max_error_retries = retries;
        self
    }

    pub fn sheets(mut self, sheets: SheetNames) -> Self {
        self.config.sheets = sheets;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_json(self) -> String {
        serde_json::to_string_pretty(&self.config).expect("Failed to serialize config")
    }
}

/// Wraps a workbook and fails appends to the named sheets.
pub struct FailingWorkbook {
    inner: Arc<dyn Workbook>,
    fail_appends: Mutex<Vec<String>>,
}

impl FailingWorkbook {
    pub fn new(inner: Arc<dyn Workbook>) -> Self {
        Self {
            inner,
            fail_appends: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_appends_to(self, sheet: &str) -> Self {
        self.fail_appends.lock().push(sheet.to_string());
        self
    }

    fn check(&self, sheet: &str) -> Result<(), WorkbookError> {
        if self.fail_appends.lock().iter().any(|s| s == sheet) {
            return Err(WorkbookError::Database(
                scanorder::db::DatabaseError::LockPoisoned,
            ));
        }
        Ok(())
    }
}

impl Workbook for FailingWorkbook {
    fn snapshot(&self, sheet: &str) -> Result<Option<SheetSnapshot>, WorkbookError> {
        self.inner.snapshot(sheet)
    }

    fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<bool, WorkbookError> {
        self.inner.create_sheet(sheet, headers)
    }

    fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<usize, WorkbookError> {
        self.check(sheet)?;
        self.inner.append_row(sheet, cells)
    }

    fn set_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), WorkbookError> {
        self.inner.set_cell(sheet, row, column, value)
    }

    fn set_cell_if(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
        expected: &dyn Fn(&str) -> bool,
    ) -> Result<bool, WorkbookError> {
        self.inner.set_cell_if(sheet, row, column, value, expected)
    }

    fn replace_rows(
        &self,
        sheet: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), WorkbookError> {
        self.inner.replace_rows(sheet, headers, rows)
    }

    fn try_lease(&self, name: &str, holder: &str, ttl: Duration) -> Result<bool, WorkbookError> {
        self.inner.try_lease(name, holder, ttl)
    }

    fn release_lease(&self, name: &str, holder: &str) -> Result<(), WorkbookError> {
        self.inner.release_lease(name, holder)
    }
}
