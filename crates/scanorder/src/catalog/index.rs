use std::collections::HashMap;

use thiserror::Error;

use crate::order::model::{match_key, CatalogItem};
use crate::workbook::{cell, CatalogColumns, SheetSnapshot, WorkbookError};

/// Catalog rows keyed by normalized serial.
///
/// Cells are kept exactly as stored; only the lookup key is normalized.
/// Rows with a blank serial are skipped. When a serial appears more than
/// once, the first row in sheet order wins.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    items: Vec<CatalogItem>,
    by_serial: HashMap<String, usize>,
}

impl CatalogIndex {
    pub fn from_snapshot(snapshot: &SheetSnapshot) -> Result<Self, WorkbookError> {
        let columns = CatalogColumns::resolve(snapshot)?;
        let items = snapshot
            .data_rows()
            .map(|(_, row)| CatalogItem {
                serial: cell(row, columns.serial).to_string(),
                machine: cell(row, columns.machine).to_string(),
                station: cell(row, columns.station).to_string(),
                coordinate: cell(row, columns.coordinate).to_string(),
                model: cell(row, columns.model).to_string(),
                work_order: cell(row, columns.work_order).to_string(),
                variant: cell(row, columns.variant).to_string(),
                batch: cell(row, columns.batch).to_string(),
            })
            .collect();
        Ok(Self::from_items(items))
    }

    pub fn from_items(items: Vec<CatalogItem>) -> Self {
        let mut kept = Vec::with_capacity(items.len());
        let mut by_serial = HashMap::with_capacity(items.len());
        for item in items {
            let key = match_key(&item.serial);
            if key.is_empty() || by_serial.contains_key(&key) {
                continue;
            }
            by_serial.insert(key, kept.len());
            kept.push(item);
        }
        Self {
            items: kept,
            by_serial,
        }
    }

    pub fn get(&self, serial: &str) -> Option<&CatalogItem> {
        self.by_serial
            .get(&match_key(serial))
            .map(|&i| &self.items[i])
    }

    /// Variant of a serial, or `None` when the serial is unknown or its
    /// variant cell is blank.
    pub fn variant_of(&self, serial: &str) -> Option<&str> {
        self.get(serial)
            .map(|item| item.variant.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Item not found in reference data")]
pub struct ItemNotFound {
    pub serial: String,
}

/// Looks a scanned serial up in the catalog.
pub struct ItemResolver<'a> {
    catalog: &'a CatalogIndex,
}

impl<'a> ItemResolver<'a> {
    pub fn new(catalog: &'a CatalogIndex) -> Self {
        Self { catalog }
    }

    pub fn resolve(&self, serial: &str) -> Result<CatalogItem, ItemNotFound> {
        self.catalog
            .get(serial)
            .cloned()
            .ok_or_else(|| ItemNotFound {
                serial: serial.trim().to_string(),
            })
    }
}
