//! Tabular store abstraction.
//!
//! A workbook is a set of named sheets, each with a header row followed by
//! data rows of text cells. Coordinates follow spreadsheet conventions:
//! rows and columns are 1-based and row 1 is the header.

pub mod layout;
pub mod memory;
pub mod setup;

use std::time::Duration;

use thiserror::Error;

pub use layout::{CatalogColumns, ItemColumns, OrderColumns, ScanColumns, SheetNames};
pub use memory::MemoryWorkbook;
pub use setup::ensure_layout;

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("Sheet '{sheet}' is missing column '{column}'")]
    MissingColumn { sheet: String, column: String },

    #[error("Invalid cell R{row}C{column} on sheet '{sheet}'")]
    InvalidCell {
        sheet: String,
        row: usize,
        column: usize,
    },

    #[error("Storage error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

impl WorkbookError {
    /// Another writer held the store for longer than it was willing to wait.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkbookError::Database(e) if e.is_busy())
    }
}

/// Largest addressable row, the grid size of common spreadsheet apps.
pub const MAX_ROWS: usize = 1_048_576;

/// Largest addressable column.
pub const MAX_COLUMNS: usize = 16_384;

/// Point-in-time copy of one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub name: String,
    pub headers: Vec<String>,
    /// Data rows; `rows[0]` is sheet row 2.
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Zero-based index of the first header equal to `header` (trimmed).
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// Data rows paired with their 1-based sheet row number.
    pub fn data_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i + 2, row.as_slice()))
    }

    /// Cell text at a 1-based row and zero-based column index.
    pub fn cell(&self, row: usize, index: usize) -> &str {
        row.checked_sub(2)
            .and_then(|i| self.rows.get(i))
            .map(|r| cell(r, index))
            .unwrap_or("")
    }

    /// Last row holding any non-blank cell, counting the header as row 1.
    pub fn last_row(&self) -> usize {
        let last_data = self
            .rows
            .iter()
            .rposition(|row| row.iter().any(|c| !c.trim().is_empty()));
        match last_data {
            Some(i) => i + 2,
            None if self.headers.is_empty() => 0,
            None => 1,
        }
    }
}

/// Cell text at a zero-based index; missing cells read as empty.
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Read-snapshot and append access to the shared tables.
///
/// Every write is durable when the call returns: a following `snapshot` of
/// the same sheet observes it.
pub trait Workbook: Send + Sync {
    /// Full copy of a sheet, or `None` when it does not exist.
    fn snapshot(&self, sheet: &str) -> Result<Option<SheetSnapshot>, WorkbookError>;

    /// Creates a sheet with the given header row. Returns `false` if it already existed.
    fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<bool, WorkbookError>;

    /// Appends a data row after the last stored row and returns its row number.
    fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<usize, WorkbookError>;

    /// Writes one cell, growing the row (and the sheet) as needed.
    fn set_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), WorkbookError>;

    /// Writes one cell only when its current text satisfies `expected`, and
    /// returns whether it wrote. No other writer of the store can change the
    /// cell between the check and the write.
    fn set_cell_if(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
        expected: &dyn Fn(&str) -> bool,
    ) -> Result<bool, WorkbookError>;

    /// Overwrites a sheet's header and data rows, creating the sheet if needed.
    fn replace_rows(
        &self,
        sheet: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), WorkbookError>;

    /// Writes several cells of the same row.
    fn set_cells(
        &self,
        sheet: &str,
        row: usize,
        cells: &[(usize, &str)],
    ) -> Result<(), WorkbookError> {
        for (column, value) in cells {
            self.set_cell(sheet, row, *column, value)?;
        }
        Ok(())
    }

    fn has_sheet(&self, sheet: &str) -> Result<bool, WorkbookError> {
        Ok(self.snapshot(sheet)?.is_some())
    }

    /// Takes the named lease for `holder` unless another holder has a live
    /// one. Leases are what serialize writers living in other processes; a
    /// store only one process can reach grants every request.
    fn try_lease(&self, _name: &str, _holder: &str, _ttl: Duration) -> Result<bool, WorkbookError> {
        Ok(true)
    }

    /// Drops the lease if `holder` still owns it.
    fn release_lease(&self, _name: &str, _holder: &str) -> Result<(), WorkbookError> {
        Ok(())
    }
}

pub(crate) fn check_cell(sheet: &str, row: usize, column: usize) -> Result<(), WorkbookError> {
    if row == 0 || column == 0 || row > MAX_ROWS || column > MAX_COLUMNS {
        return Err(WorkbookError::InvalidCell {
            sheet: sheet.to_string(),
            row,
            column,
        });
    }
    Ok(())
}
