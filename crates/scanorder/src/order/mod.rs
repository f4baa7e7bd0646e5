//! Orders: the generated records, how they are numbered, deduplicated and
//! stored, and how their fulfillment status moves afterwards.

pub mod duplicate;
pub mod lifecycle;
pub mod model;
pub mod recorder;
pub mod sequence;

pub use duplicate::{DuplicateCheck, DuplicateGuard, DuplicateMatch};
pub use lifecycle::{OrderDetails, OrderFilter, OrderQuery, OrderUpdateError, OrderUpdater, StatusUpdate};
pub use model::{CatalogItem, Order, OrderLineItem, OrderRow, OrderStatus};
pub use recorder::{LineItemOutcome, OrderRecorder, RecordReceipt};
pub use sequence::SequenceAllocator;

use crate::workbook::{cell, OrderColumns, SheetSnapshot, WorkbookError};

/// Snapshot of the order sheet with its columns resolved.
#[derive(Debug, Clone)]
pub struct OrderTable {
    snapshot: SheetSnapshot,
    columns: OrderColumns,
}

impl OrderTable {
    pub fn from_snapshot(snapshot: SheetSnapshot) -> Result<Self, WorkbookError> {
        let columns = OrderColumns::resolve(&snapshot)?;
        Ok(Self { snapshot, columns })
    }

    pub fn name(&self) -> &str {
        &self.snapshot.name
    }

    pub fn headers(&self) -> &[String] {
        &self.snapshot.headers
    }

    pub fn columns(&self) -> &OrderColumns {
        &self.columns
    }

    /// Raw order identifiers in sheet order, blanks included.
    pub fn order_ids(&self) -> impl Iterator<Item = &str> {
        let index = self.columns.order_id;
        self.snapshot.data_rows().map(move |(_, row)| cell(row, index))
    }

    pub fn entries(&self) -> impl Iterator<Item = OrderEntry<'_>> {
        self.snapshot
            .data_rows()
            .filter(|(_, cells)| cells.iter().any(|c| !c.trim().is_empty()))
            .map(move |(row, cells)| OrderEntry {
                row,
                cells,
                columns: &self.columns,
            })
    }

    /// First row whose id matches `order_id`, trimmed and case-insensitive.
    pub fn find(&self, order_id: &str) -> Option<OrderEntry<'_>> {
        let wanted = model::match_key(order_id);
        self.entries().find(|e| model::match_key(e.order_id()) == wanted)
    }
}

/// Borrowed view of one stored order row.
#[derive(Debug, Clone, Copy)]
pub struct OrderEntry<'a> {
    pub row: usize,
    cells: &'a [String],
    columns: &'a OrderColumns,
}

impl<'a> OrderEntry<'a> {
    pub fn order_id(&self) -> &'a str {
        cell(self.cells, self.columns.order_id)
    }

    pub fn created_at(&self) -> &'a str {
        cell(self.cells, self.columns.created_at)
    }

    pub fn serial(&self) -> &'a str {
        cell(self.cells, self.columns.serial)
    }

    pub fn variant(&self) -> &'a str {
        cell(self.cells, self.columns.variant)
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(cell(self.cells, self.columns.status))
    }

    pub fn to_row(&self) -> OrderRow {
        OrderRow::from_cells(self.row, self.cells, self.columns)
    }
}
