use log::info;

use super::layout::{items, orders, scans, SheetNames};
use super::{Workbook, WorkbookError};

/// Creates the scan, order and line-item sheets with their header rows when
/// they are missing. Existing sheets are left untouched. The catalog sheet is
/// operator-maintained and never created here.
///
/// Returns the names of the sheets that were created.
pub fn ensure_layout(
    workbook: &dyn Workbook,
    names: &SheetNames,
) -> Result<Vec<String>, WorkbookError> {
    let wanted: [(&str, &[&str]); 3] = [
        (names.scans.as_str(), &scans::HEADERS[..]),
        (names.orders.as_str(), &orders::HEADERS[..]),
        (names.items.as_str(), &items::HEADERS[..]),
    ];

    let mut created = Vec::new();
    for (sheet, headers) in wanted {
        let headers: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        if workbook.create_sheet(sheet, &headers)? {
            info!("Created sheet '{}' with {} columns", sheet, headers.len());
            created.push(sheet.to_string());
        }
    }
    Ok(created)
}
