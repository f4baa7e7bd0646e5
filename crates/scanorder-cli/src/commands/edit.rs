use anyhow::{Context, Result};
use scanorder::pipeline::NoopProgress;
use scanorder::worker::EditEvent;
use scanorder::{ScanService, Workbook};

use super::{print_result, AppContext};

/// Writes the value the way an operator's edit would, then hands the edit to
/// the trigger filter.
pub fn run(
    ctx: &AppContext,
    row: usize,
    value: &str,
    sheet: Option<String>,
    column: usize,
) -> Result<()> {
    let sheet = sheet.unwrap_or_else(|| ctx.config.sheets.scans.clone());
    if ctx.workbook.has_sheet(&sheet)? {
        ctx.workbook
            .set_cell(&sheet, row, column, value)
            .with_context(|| format!("Failed to write R{}C{} on '{}'", row, column, sheet))?;
    }

    let edit = EditEvent {
        sheet,
        row,
        column,
        value: value.to_string(),
    };
    let result = ScanService::new(ctx.pipeline())
        .on_edit(&edit, &NoopProgress)
        .context("Failed to process edit")?;

    print_result(&result);
    Ok(())
}
