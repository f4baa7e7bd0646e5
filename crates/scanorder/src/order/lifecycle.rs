use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::clock::format_timestamp;
use crate::pipeline::lock::OrderTableLock;
use crate::workbook::layout::orders;
use crate::workbook::{ItemColumns, SheetNames, Workbook, WorkbookError};

use super::model::{match_key, OrderLineItem, OrderRow, OrderStatus};
use super::OrderTable;

const URGENT_DONE: &str = "Concluido Urgente";

#[derive(Error, Debug)]
pub enum OrderUpdateError {
    #[error("Order '{0}' not found")]
    NotFound(String),

    #[error("Sheet '{0}' not found")]
    SheetMissing(String),

    #[error("Order table busy; lock not acquired within {waited_ms} ms")]
    Busy { waited_ms: u128 },

    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

/// A fulfillment status change made by an operator.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub order_id: String,
    pub status: OrderStatus,
    pub actor: String,
    pub at: NaiveDateTime,
    pub mark_urgent_done: bool,
}

/// Moves existing orders through fulfillment. Shares the order-table lock
/// with the scan pipeline so edits never interleave with appends.
pub struct OrderUpdater {
    workbook: Arc<dyn Workbook>,
    sheets: SheetNames,
    lock: OrderTableLock,
    lock_timeout: Duration,
}

impl OrderUpdater {
    pub fn new(
        workbook: Arc<dyn Workbook>,
        sheets: SheetNames,
        lock: OrderTableLock,
        lock_timeout: Duration,
    ) -> Self {
        Self {
            workbook,
            sheets,
            lock,
            lock_timeout,
        }
    }

    /// Applies `update` and returns the order as stored afterwards.
    pub fn update_status(&self, update: &StatusUpdate) -> Result<OrderRow, OrderUpdateError> {
        let _guard = self
            .lock
            .acquire_shared(&*self.workbook, &self.sheets.orders, self.lock_timeout)?
            .ok_or(OrderUpdateError::Busy {
                waited_ms: self.lock_timeout.as_millis(),
            })?;

        let sheet = &self.sheets.orders;
        let snapshot = self
            .workbook
            .snapshot(sheet)?
            .ok_or_else(|| OrderUpdateError::SheetMissing(sheet.clone()))?;
        let table = OrderTable::from_snapshot(snapshot)?;
        let row = table
            .find(&update.order_id)
            .map(|entry| entry.row)
            .ok_or_else(|| OrderUpdateError::NotFound(update.order_id.trim().to_string()))?;

        let at = format_timestamp(&update.at);
        let mut changes = vec![
            (orders::STATUS, update.status.label().to_string()),
            (orders::UPDATED_AT, at.clone()),
            (orders::UPDATED_BY, update.actor.clone()),
        ];
        match update.status {
            OrderStatus::Separating => {
                changes.push((orders::SEPARATION_OWNER, update.actor.clone()));
                changes.push((orders::SEPARATION_AT, at.clone()));
            }
            OrderStatus::Collecting => {
                changes.push((orders::PICKUP_OWNER, update.actor.clone()));
                changes.push((orders::PICKUP_AT, at.clone()));
            }
            _ => {}
        }
        if update.mark_urgent_done {
            changes.push((orders::URGENT, URGENT_DONE.to_string()));
        }

        // Resolve every column before writing so a malformed sheet is left as is.
        let mut cells = Vec::with_capacity(changes.len());
        for (header, value) in &changes {
            let index = table
                .columns()
                .position(header)
                .ok_or_else(|| WorkbookError::MissingColumn {
                    sheet: sheet.clone(),
                    column: header.to_string(),
                })?;
            cells.push((index + 1, value.as_str()));
        }
        self.workbook.set_cells(sheet, row, &cells)?;

        info!(
            "Order {} moved to {} by {}",
            update.order_id.trim(),
            update.status,
            update.actor
        );

        let snapshot = self
            .workbook
            .snapshot(sheet)?
            .ok_or_else(|| OrderUpdateError::SheetMissing(sheet.clone()))?;
        let table = OrderTable::from_snapshot(snapshot)?;
        table
            .find(&update.order_id)
            .map(|entry| entry.to_row())
            .ok_or_else(|| OrderUpdateError::NotFound(update.order_id.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order: OrderRow,
    pub items: Vec<OrderLineItem>,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub newest_first: bool,
    pub limit: Option<usize>,
}

/// Read-only access to stored orders.
pub struct OrderQuery {
    workbook: Arc<dyn Workbook>,
    sheets: SheetNames,
}

impl OrderQuery {
    pub fn new(workbook: Arc<dyn Workbook>, sheets: SheetNames) -> Self {
        Self { workbook, sheets }
    }

    fn table(&self) -> Result<OrderTable, WorkbookError> {
        let snapshot = self
            .workbook
            .snapshot(&self.sheets.orders)?
            .ok_or_else(|| WorkbookError::SheetNotFound(self.sheets.orders.clone()))?;
        OrderTable::from_snapshot(snapshot)
    }

    /// The order and all of its line items, or `None` for an unknown id.
    /// A missing line-item sheet yields an empty item list.
    pub fn details(&self, order_id: &str) -> Result<Option<OrderDetails>, WorkbookError> {
        let table = self.table()?;
        let Some(order) = table.find(order_id).map(|entry| entry.to_row()) else {
            return Ok(None);
        };

        let mut items = Vec::new();
        if let Some(snapshot) = self.workbook.snapshot(&self.sheets.items)? {
            let columns = ItemColumns::resolve(&snapshot)?;
            let wanted = match_key(&order.order_id);
            items = snapshot
                .data_rows()
                .map(|(_, cells)| OrderLineItem::from_cells(cells, &columns))
                .filter(|item| match_key(&item.order_id) == wanted)
                .collect();
        }
        Ok(Some(OrderDetails { order, items }))
    }

    pub fn list(&self, filter: &OrderFilter) -> Result<Vec<OrderRow>, WorkbookError> {
        let table = self.table()?;
        let mut rows: Vec<OrderRow> = table
            .entries()
            .filter(|entry| filter.status.as_ref().map_or(true, |s| entry.status() == *s))
            .map(|entry| entry.to_row())
            .collect();
        if filter.newest_first {
            rows.reverse();
        }
        if let Some(limit) = filter.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }
}
