use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::format_timestamp;
use crate::workbook::layout::{items, orders, ItemColumns, OrderColumns};
use crate::workbook::cell;

/// Every generated order identifier starts with this prefix.
pub const ORDER_ID_PREFIX: &str = "REQ-";

/// Each scan requests exactly one unit.
pub const LINE_ITEM_QUANTITY: u32 = 1;

const URGENT_YES: &str = "Sim";
const URGENT_NO: &str = "Não";

/// Comparison key for serials and variants: trimmed and upper-cased.
pub fn match_key(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Reference data for one serial, as read from the catalog sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub serial: String,
    pub machine: String,
    pub station: String,
    pub coordinate: String,
    pub model: String,
    pub work_order: String,
    /// Semi-finished good the serial belongs to; scopes duplicate detection.
    pub variant: String,
    pub batch: String,
}

/// Fulfillment status of an order. Stored with the labels the fulfillment
/// app uses; English names are accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Separating,
    Collecting,
    Completed,
    Cancelled,
    Other(String),
}

impl OrderStatus {
    pub fn label(&self) -> &str {
        match self {
            OrderStatus::Pending => "PENDENTE",
            OrderStatus::Separating => "EM SEPARAÇÃO",
            OrderStatus::Collecting => "EM COLETA",
            OrderStatus::Completed => "CONCLUÍDO",
            OrderStatus::Cancelled => "CANCELADO",
            OrderStatus::Other(label) => label,
        }
    }

    pub fn parse(value: &str) -> Self {
        match match_key(value).as_str() {
            "PENDENTE" | "PENDING" => OrderStatus::Pending,
            "EM SEPARAÇÃO" | "EM SEPARACAO" | "SEPARATING" => OrderStatus::Separating,
            "EM COLETA" | "COLLECTING" => OrderStatus::Collecting,
            "CONCLUÍDO" | "CONCLUIDO" | "COMPLETED" => OrderStatus::Completed,
            "CANCELADO" | "CANCELLED" | "CANCELED" => OrderStatus::Cancelled,
            _ => OrderStatus::Other(value.trim().to_string()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A newly generated order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: String,
    pub created_at: NaiveDateTime,
    pub item: CatalogItem,
    pub status: OrderStatus,
    pub urgent: bool,
    pub last_updated_at: NaiveDateTime,
    pub last_updated_by: String,
    pub separation_owner: String,
    pub separation_at: Option<NaiveDateTime>,
    pub pickup_owner: String,
    pub pickup_at: Option<NaiveDateTime>,
    pub requested_by: String,
    pub notes: String,
}

impl Order {
    /// A pending, non-urgent order whose timestamps all equal `at`.
    pub fn pending(
        order_id: String,
        item: CatalogItem,
        at: NaiveDateTime,
        requested_by: &str,
        notes: &str,
    ) -> Self {
        Self {
            order_id,
            created_at: at,
            item,
            status: OrderStatus::Pending,
            urgent: false,
            last_updated_at: at,
            last_updated_by: requested_by.to_string(),
            separation_owner: String::new(),
            separation_at: None,
            pickup_owner: String::new(),
            pickup_at: None,
            requested_by: requested_by.to_string(),
            notes: notes.to_string(),
        }
    }

    pub fn line_item(&self) -> OrderLineItem {
        OrderLineItem {
            order_id: self.order_id.clone(),
            serial: self.item.serial.clone(),
            quantity: LINE_ITEM_QUANTITY,
        }
    }

    /// The order as stored text cells.
    pub fn to_row(&self) -> OrderRow {
        let optional = |ts: &Option<NaiveDateTime>| ts.as_ref().map(format_timestamp).unwrap_or_default();
        OrderRow {
            row: 0,
            order_id: self.order_id.clone(),
            created_at: format_timestamp(&self.created_at),
            serial: self.item.serial.clone(),
            machine: self.item.machine.clone(),
            station: self.item.station.clone(),
            coordinate: self.item.coordinate.clone(),
            model: self.item.model.clone(),
            work_order: self.item.work_order.clone(),
            variant: self.item.variant.clone(),
            batch: self.item.batch.clone(),
            status: self.status.label().to_string(),
            urgent: if self.urgent { URGENT_YES } else { URGENT_NO }.to_string(),
            updated_at: format_timestamp(&self.last_updated_at),
            updated_by: self.last_updated_by.clone(),
            separation_owner: self.separation_owner.clone(),
            separation_at: optional(&self.separation_at),
            pickup_owner: self.pickup_owner.clone(),
            pickup_at: optional(&self.pickup_at),
            requested_by: self.requested_by.clone(),
            notes: self.notes.clone(),
        }
    }
}

/// One order row exactly as the sheet holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRow {
    /// 1-based sheet row; 0 for rows not yet stored.
    pub row: usize,
    pub order_id: String,
    pub created_at: String,
    pub serial: String,
    pub machine: String,
    pub station: String,
    pub coordinate: String,
    pub model: String,
    pub work_order: String,
    pub variant: String,
    pub batch: String,
    pub status: String,
    pub urgent: String,
    pub updated_at: String,
    pub updated_by: String,
    pub separation_owner: String,
    pub separation_at: String,
    pub pickup_owner: String,
    pub pickup_at: String,
    pub requested_by: String,
    pub notes: String,
}

impl OrderRow {
    pub fn from_cells(row: usize, cells: &[String], columns: &OrderColumns) -> Self {
        let get = |header: &str| {
            columns
                .position(header)
                .map(|i| cell(cells, i).to_string())
                .unwrap_or_default()
        };
        Self {
            row,
            order_id: get(orders::ORDER_ID),
            created_at: get(orders::CREATED_AT),
            serial: get(orders::SERIAL),
            machine: get(orders::MACHINE),
            station: get(orders::STATION),
            coordinate: get(orders::COORDINATE),
            model: get(orders::MODEL),
            work_order: get(orders::WORK_ORDER),
            variant: get(orders::VARIANT),
            batch: get(orders::BATCH),
            status: get(orders::STATUS),
            urgent: get(orders::URGENT),
            updated_at: get(orders::UPDATED_AT),
            updated_by: get(orders::UPDATED_BY),
            separation_owner: get(orders::SEPARATION_OWNER),
            separation_at: get(orders::SEPARATION_AT),
            pickup_owner: get(orders::PICKUP_OWNER),
            pickup_at: get(orders::PICKUP_AT),
            requested_by: get(orders::REQUESTED_BY),
            notes: get(orders::NOTES),
        }
    }

    /// Header/value pairs for laying the row out along a sheet's headers.
    pub fn cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (orders::ORDER_ID, self.order_id.clone()),
            (orders::CREATED_AT, self.created_at.clone()),
            (orders::SERIAL, self.serial.clone()),
            (orders::MACHINE, self.machine.clone()),
            (orders::STATION, self.station.clone()),
            (orders::COORDINATE, self.coordinate.clone()),
            (orders::MODEL, self.model.clone()),
            (orders::WORK_ORDER, self.work_order.clone()),
            (orders::VARIANT, self.variant.clone()),
            (orders::BATCH, self.batch.clone()),
            (orders::STATUS, self.status.clone()),
            (orders::URGENT, self.urgent.clone()),
            (orders::UPDATED_AT, self.updated_at.clone()),
            (orders::UPDATED_BY, self.updated_by.clone()),
            (orders::SEPARATION_OWNER, self.separation_owner.clone()),
            (orders::SEPARATION_AT, self.separation_at.clone()),
            (orders::PICKUP_OWNER, self.pickup_owner.clone()),
            (orders::PICKUP_AT, self.pickup_at.clone()),
            (orders::REQUESTED_BY, self.requested_by.clone()),
            (orders::NOTES, self.notes.clone()),
        ]
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::parse(&self.status)
    }
}

/// The single line item generated alongside every order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub order_id: String,
    pub serial: String,
    pub quantity: u32,
}

impl OrderLineItem {
    /// Parses a stored line item. A non-numeric quantity reads as 0.
    pub fn from_cells(cells: &[String], columns: &ItemColumns) -> Self {
        Self {
            order_id: cell(cells, columns.order_id).to_string(),
            serial: cell(cells, columns.serial).to_string(),
            quantity: cell(cells, columns.quantity).trim().parse().unwrap_or(0),
        }
    }

    pub fn cells(&self) -> Vec<(&'static str, String)> {
        vec![
            (items::ORDER_ID, self.order_id.clone()),
            (items::SERIAL, self.serial.clone()),
            (items::QUANTITY, self.quantity.to_string()),
        ]
    }
}
