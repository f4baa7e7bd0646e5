use chrono::NaiveDateTime;

use crate::pipeline::outcome::SkipReason;

use super::job::{ScanEvent, TriggerSource};

/// A cell edit reported by the store's host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditEvent {
    pub sheet: String,
    /// 1-based row.
    pub row: usize,
    /// 1-based column.
    pub column: usize,
    pub value: String,
}

/// Turns an edit into a scan event when it lands in the serial column of a
/// data row on the scan sheet. Blank values still produce an event; the
/// pipeline skips them.
pub fn scan_event_from_edit(
    edit: &EditEvent,
    scan_sheet: &str,
    serial_column: usize,
    received_at: NaiveDateTime,
) -> Result<ScanEvent, SkipReason> {
    if edit.sheet != scan_sheet {
        return Err(SkipReason::OtherSheet {
            sheet: edit.sheet.clone(),
        });
    }
    if edit.column != serial_column {
        return Err(SkipReason::OtherColumn {
            column: edit.column,
        });
    }
    if edit.row <= 1 {
        return Err(SkipReason::HeaderRow);
    }
    Ok(ScanEvent::new(
        edit.value.clone(),
        edit.row,
        TriggerSource::Edit,
        received_at,
    ))
}
