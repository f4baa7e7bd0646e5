//! In-process workbook backed by a lock-protected map.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{cell, check_cell, SheetSnapshot, Workbook, WorkbookError};

#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: RwLock<HashMap<String, SheetSnapshot>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper that seeds a sheet with headers and rows.
    pub fn with_sheet(self, name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        let snapshot = SheetSnapshot::new(
            name,
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        self.sheets.write().insert(name.to_string(), snapshot);
        self
    }

    pub fn sheet_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sheets.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Workbook for MemoryWorkbook {
    fn snapshot(&self, sheet: &str) -> Result<Option<SheetSnapshot>, WorkbookError> {
        Ok(self.sheets.read().get(sheet).cloned())
    }

    fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<bool, WorkbookError> {
        let mut sheets = self.sheets.write();
        if sheets.contains_key(sheet) {
            return Ok(false);
        }
        sheets.insert(
            sheet.to_string(),
            SheetSnapshot::new(sheet, headers.to_vec(), Vec::new()),
        );
        Ok(true)
    }

    fn append_row(&self, sheet: &str, cells: Vec<String>) -> Result<usize, WorkbookError> {
        let mut sheets = self.sheets.write();
        let snapshot = sheets
            .get_mut(sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        // Appending lands after the last non-blank row, like a spreadsheet.
        let row = snapshot.last_row().max(1) + 1;
        check_cell(sheet, row, cells.len().max(1))?;
        let index = row - 2;
        if snapshot.rows.len() > index {
            snapshot.rows[index] = cells;
        } else {
            snapshot.rows.resize(index, Vec::new());
            snapshot.rows.push(cells);
        }
        Ok(row)
    }

    fn set_cell(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
    ) -> Result<(), WorkbookError> {
        check_cell(sheet, row, column)?;
        let mut sheets = self.sheets.write();
        let snapshot = sheets
            .get_mut(sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        write_cell(snapshot, row, column, value);
        Ok(())
    }

    fn set_cell_if(
        &self,
        sheet: &str,
        row: usize,
        column: usize,
        value: &str,
        expected: &dyn Fn(&str) -> bool,
    ) -> Result<bool, WorkbookError> {
        check_cell(sheet, row, column)?;
        let mut sheets = self.sheets.write();
        let snapshot = sheets
            .get_mut(sheet)
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.to_string()))?;
        let current = if row == 1 {
            cell(&snapshot.headers, column - 1)
        } else {
            snapshot.cell(row, column - 1)
        };
        if !expected(current) {
            return Ok(false);
        }
        write_cell(snapshot, row, column, value);
        Ok(true)
    }

    fn replace_rows(
        &self,
        sheet: &str,
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    ) -> Result<(), WorkbookError> {
        self.sheets
            .write()
            .insert(sheet.to_string(), SheetSnapshot::new(sheet, headers, rows));
        Ok(())
    }
}

fn write_cell(snapshot: &mut SheetSnapshot, row: usize, column: usize, value: &str) {
    let cells = if row == 1 {
        &mut snapshot.headers
    } else {
        let index = row - 2;
        if snapshot.rows.len() <= index {
            snapshot.rows.resize(index + 1, Vec::new());
        }
        &mut snapshot.rows[index]
    };
    if cells.len() < column {
        cells.resize(column, String::new());
    }
    cells[column - 1] = value.to_string();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::MAX_ROWS;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_create_sheet_once() {
        let wb = MemoryWorkbook::new();
        assert!(wb.create_sheet("Itens", &headers(&["A"])).unwrap());
        assert!(!wb.create_sheet("Itens", &headers(&["B"])).unwrap());
        let snap = wb.snapshot("Itens").unwrap().unwrap();
        assert_eq!(snap.headers, vec!["A"]);
    }

    #[test]
    fn test_append_returns_row_numbers() {
        let wb = MemoryWorkbook::new();
        wb.create_sheet("Itens", &headers(&["A"])).unwrap();
        assert_eq!(wb.append_row("Itens", vec!["x".into()]).unwrap(), 2);
        assert_eq!(wb.append_row("Itens", vec!["y".into()]).unwrap(), 3);
        let snap = wb.snapshot("Itens").unwrap().unwrap();
        assert_eq!(snap.rows.len(), 2);
    }

    #[test]
    fn test_append_reuses_blank_tail() {
        let wb = MemoryWorkbook::new().with_sheet("S", &["A"], &[&["x"], &[""]]);
        assert_eq!(wb.append_row("S", vec!["y".into()]).unwrap(), 3);
        let snap = wb.snapshot("S").unwrap().unwrap();
        assert_eq!(snap.rows, vec![vec!["x".to_string()], vec!["y".to_string()]]);
    }

    #[test]
    fn test_append_to_missing_sheet_fails() {
        let wb = MemoryWorkbook::new();
        let err = wb.append_row("Pedidos", vec![]).unwrap_err();
        assert!(matches!(err, WorkbookError::SheetNotFound(name) if name == "Pedidos"));
    }

    #[test]
    fn test_set_cell_grows_rows_and_columns() {
        let wb = MemoryWorkbook::new().with_sheet("S", &["A", "B"], &[]);
        wb.set_cell("S", 4, 3, "z").unwrap();
        let snap = wb.snapshot("S").unwrap().unwrap();
        assert_eq!(snap.rows.len(), 3);
        assert_eq!(snap.cell(4, 2), "z");
        assert_eq!(snap.cell(4, 0), "");
    }

    #[test]
    fn test_set_cell_outside_grid_is_rejected() {
        let wb = MemoryWorkbook::new().with_sheet("S", &["A"], &[&["x"]]);
        let err = wb.set_cell("S", 1_000_000_000, 1, "X").unwrap_err();
        assert!(matches!(err, WorkbookError::InvalidCell { .. }));
        assert!(wb.set_cell("S", MAX_ROWS + 1, 1, "X").is_err());
        assert_eq!(wb.snapshot("S").unwrap().unwrap().rows.len(), 1);
    }

    #[test]
    fn test_set_cell_if_checks_current_value() {
        let wb = MemoryWorkbook::new().with_sheet("S", &["A", "Status"], &[&["x", ""]]);
        let blank = |current: &str| current.trim().is_empty();
        assert!(wb.set_cell_if("S", 2, 2, "PROCESSANDO", &blank).unwrap());
        assert!(!wb.set_cell_if("S", 2, 2, "PROCESSANDO", &blank).unwrap());
        assert_eq!(wb.snapshot("S").unwrap().unwrap().cell(2, 1), "PROCESSANDO");

        // Cells past the stored row read as blank.
        assert!(wb.set_cell_if("S", 3, 2, "PROCESSANDO", &blank).unwrap());
        assert!(matches!(
            wb.set_cell_if("T", 2, 2, "x", &blank),
            Err(WorkbookError::SheetNotFound(_))
        ));
    }

    #[test]
    fn test_set_cells_writes_all() {
        let wb = MemoryWorkbook::new().with_sheet("S", &["A", "B"], &[&["1", "2"]]);
        wb.set_cells("S", 2, &[(1, "x"), (2, "y")]).unwrap();
        let snap = wb.snapshot("S").unwrap().unwrap();
        assert_eq!(snap.rows[0], vec!["x", "y"]);
    }

    #[test]
    fn test_replace_rows_overwrites() {
        let wb = MemoryWorkbook::new().with_sheet("paco", &["Serial"], &[&["old"]]);
        wb.replace_rows("paco", headers(&["Serial", "OT"]), vec![headers(&["new", "7"])])
            .unwrap();
        let snap = wb.snapshot("paco").unwrap().unwrap();
        assert_eq!(snap.headers.len(), 2);
        assert_eq!(snap.cell(2, 0), "new");
    }

    #[test]
    fn test_sheet_names_sorted() {
        let wb = MemoryWorkbook::new()
            .with_sheet("b", &[], &[])
            .with_sheet("a", &[], &[]);
        assert_eq!(wb.sheet_names(), vec!["a", "b"]);
    }
}
