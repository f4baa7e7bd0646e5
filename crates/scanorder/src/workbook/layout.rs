//! Column layouts of the four sheets the pipeline touches.
//!
//! Headers are looked up by name, so operators may reorder columns freely.
//! Each `*Columns` struct is resolved once from a snapshot's header row and
//! then indexes rows with zero-based positions.

use serde::{Deserialize, Serialize};

use super::{SheetSnapshot, WorkbookError};

/// Scan sheet columns, in creation order.
pub mod scans {
    pub const SERIAL: &str = "Serial";
    pub const READ_AT: &str = "Data_Leitura";
    pub const STATUS: &str = "Status";
    pub const MESSAGE: &str = "Mensagem";
    pub const ORDER_ID: &str = "Numero_Pedido";

    pub const HEADERS: [&str; 5] = [SERIAL, READ_AT, STATUS, MESSAGE, ORDER_ID];
}

/// Catalog sheet columns the pipeline reads. Other columns are ignored.
pub mod catalog {
    pub const SERIAL: &str = "Serial";
    pub const MACHINE: &str = "Maquina";
    pub const STATION: &str = "Posto";
    pub const COORDINATE: &str = "Coordenada";
    pub const MODEL: &str = "Modelo";
    pub const WORK_ORDER: &str = "OT";
    pub const VARIANT: &str = "Semiacabado";
    pub const BATCH: &str = "Pagoda";

    pub const HEADERS: [&str; 8] = [
        SERIAL, MACHINE, STATION, COORDINATE, MODEL, WORK_ORDER, VARIANT, BATCH,
    ];
}

/// Order sheet columns, in creation order.
pub mod orders {
    pub const ORDER_ID: &str = "Numero_Pedido";
    pub const CREATED_AT: &str = "Data";
    pub const SERIAL: &str = "Serial";
    pub const MACHINE: &str = "Maquina";
    pub const STATION: &str = "Posto";
    pub const COORDINATE: &str = "Coordenada";
    pub const MODEL: &str = "Modelo";
    pub const WORK_ORDER: &str = "OT";
    pub const VARIANT: &str = "Semiacabado";
    pub const BATCH: &str = "Pagoda";
    pub const STATUS: &str = "Status";
    pub const URGENT: &str = "Urgente";
    pub const UPDATED_AT: &str = "Ultima_Atualizacao";
    pub const UPDATED_BY: &str = "Responsavel_Atualizacao";
    pub const SEPARATION_OWNER: &str = "Responsavel_Separacao";
    pub const SEPARATION_AT: &str = "Data_Separacao";
    pub const PICKUP_OWNER: &str = "Responsavel_Coleta";
    pub const PICKUP_AT: &str = "Data_Coleta";
    pub const REQUESTED_BY: &str = "Solicitante";
    pub const NOTES: &str = "Observacoes";

    pub const HEADERS: [&str; 20] = [
        ORDER_ID,
        CREATED_AT,
        SERIAL,
        MACHINE,
        STATION,
        COORDINATE,
        MODEL,
        WORK_ORDER,
        VARIANT,
        BATCH,
        STATUS,
        URGENT,
        UPDATED_AT,
        UPDATED_BY,
        SEPARATION_OWNER,
        SEPARATION_AT,
        PICKUP_OWNER,
        PICKUP_AT,
        REQUESTED_BY,
        NOTES,
    ];
}

/// Line-item sheet columns, in creation order.
pub mod items {
    pub const ORDER_ID: &str = "Numero_Pedido";
    pub const SERIAL: &str = "Serial";
    pub const QUANTITY: &str = "Quantidade";

    pub const HEADERS: [&str; 3] = [ORDER_ID, SERIAL, QUANTITY];
}

/// Names of the sheets in the shared workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetNames {
    #[serde(default = "default_scans")]
    pub scans: String,
    #[serde(default = "default_catalog")]
    pub catalog: String,
    #[serde(default = "default_orders")]
    pub orders: String,
    #[serde(default = "default_items")]
    pub items: String,
}

fn default_scans() -> String {
    "Leituras".to_string()
}

fn default_catalog() -> String {
    "paco".to_string()
}

fn default_orders() -> String {
    "Pedidos".to_string()
}

fn default_items() -> String {
    "Itens".to_string()
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            scans: default_scans(),
            catalog: default_catalog(),
            orders: default_orders(),
            items: default_items(),
        }
    }
}

fn require(snapshot: &SheetSnapshot, header: &str) -> Result<usize, WorkbookError> {
    snapshot
        .column_index(header)
        .ok_or_else(|| WorkbookError::MissingColumn {
            sheet: snapshot.name.clone(),
            column: header.to_string(),
        })
}

/// Zero-based positions of the scan sheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanColumns {
    pub serial: usize,
    pub read_at: usize,
    pub status: usize,
    pub message: usize,
    pub order_id: usize,
}

impl ScanColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> Result<Self, WorkbookError> {
        Ok(Self {
            serial: require(snapshot, scans::SERIAL)?,
            read_at: require(snapshot, scans::READ_AT)?,
            status: require(snapshot, scans::STATUS)?,
            message: require(snapshot, scans::MESSAGE)?,
            order_id: require(snapshot, scans::ORDER_ID)?,
        })
    }
}

/// Zero-based positions of the catalog columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogColumns {
    pub serial: usize,
    pub machine: usize,
    pub station: usize,
    pub coordinate: usize,
    pub model: usize,
    pub work_order: usize,
    pub variant: usize,
    pub batch: usize,
}

impl CatalogColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> Result<Self, WorkbookError> {
        Ok(Self {
            serial: require(snapshot, catalog::SERIAL)?,
            machine: require(snapshot, catalog::MACHINE)?,
            station: require(snapshot, catalog::STATION)?,
            coordinate: require(snapshot, catalog::COORDINATE)?,
            model: require(snapshot, catalog::MODEL)?,
            work_order: require(snapshot, catalog::WORK_ORDER)?,
            variant: require(snapshot, catalog::VARIANT)?,
            batch: require(snapshot, catalog::BATCH)?,
        })
    }
}

/// Positions of the order columns. Only the columns the pipeline reads are
/// required; writes go through [`OrderColumns::position`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderColumns {
    pub order_id: usize,
    pub created_at: usize,
    pub serial: usize,
    pub variant: usize,
    pub status: usize,
    headers: Vec<String>,
}

impl OrderColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> Result<Self, WorkbookError> {
        Ok(Self {
            order_id: require(snapshot, orders::ORDER_ID)?,
            created_at: require(snapshot, orders::CREATED_AT)?,
            serial: require(snapshot, orders::SERIAL)?,
            variant: require(snapshot, orders::VARIANT)?,
            status: require(snapshot, orders::STATUS)?,
            headers: snapshot.headers.iter().map(|h| h.trim().to_string()).collect(),
        })
    }

    /// Zero-based position of any order column present in the sheet.
    pub fn position(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// Zero-based positions of the line-item columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemColumns {
    pub order_id: usize,
    pub serial: usize,
    pub quantity: usize,
}

impl ItemColumns {
    pub fn resolve(snapshot: &SheetSnapshot) -> Result<Self, WorkbookError> {
        Ok(Self {
            order_id: require(snapshot, items::ORDER_ID)?,
            serial: require(snapshot, items::SERIAL)?,
            quantity: require(snapshot, items::QUANTITY)?,
        })
    }
}

/// Lays out `values` (header → text) along a header row. Unknown headers
/// stay empty; values for absent headers are dropped.
pub fn row_for_headers(headers: &[String], values: &[(&str, String)]) -> Vec<String> {
    headers
        .iter()
        .map(|h| {
            values
                .iter()
                .find(|(name, _)| *name == h.trim())
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        })
        .collect()
}
