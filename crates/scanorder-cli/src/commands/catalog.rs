use std::path::Path;

use anyhow::{Context, Result};
use scanorder::import_csv;

use super::AppContext;

pub fn import(ctx: &AppContext, path: &Path) -> Result<()> {
    let sheet = &ctx.config.sheets.catalog;
    let summary = import_csv(&*ctx.workbook, sheet, path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    println!("Imported {} rows into '{}'", summary.rows, sheet);
    if summary.blank_serials > 0 {
        println!("{} rows have no serial and will never match", summary.blank_serials);
    }
    if !summary.missing_columns.is_empty() {
        println!(
            "Missing columns: {} (scans fail until they are added)",
            summary.missing_columns.join(", ")
        );
    }
    Ok(())
}
