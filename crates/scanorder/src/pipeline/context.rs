use crate::catalog::CatalogIndex;
use crate::order::{CatalogItem, Order, OrderTable};
use crate::worker::job::ScanEvent;
use crate::workbook::ScanColumns;

use super::error::PipelineWarning;

pub struct ScanContext {
    // Input
    pub event: ScanEvent,

    // Trimmed serial, non-empty once the run starts
    pub serial: String,

    // Resolved when the scan row is marked as processing
    pub scan_columns: Option<ScanColumns>,

    // Snapshots taken under the order-table lock; None when the sheet is absent
    pub catalog: Option<CatalogIndex>,
    pub orders: Option<OrderTable>,

    // Resolution and allocation results
    pub item: Option<CatalogItem>,
    pub order: Option<Order>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,
}

impl ScanContext {
    pub fn new(event: ScanEvent) -> Self {
        let serial = event.serial.trim().to_string();
        Self {
            event,
            serial,
            scan_columns: None,
            catalog: None,
            orders: None,
            item: None,
            order: None,
            warnings: Vec::new(),
        }
    }
}
