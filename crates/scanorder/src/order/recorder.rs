use log::warn;

use crate::workbook::layout::row_for_headers;
use crate::workbook::{ItemColumns, SheetNames, Workbook, WorkbookError};

use super::model::Order;
use super::OrderTable;

/// What happened to the line item of a recorded order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItemOutcome {
    Recorded { row: usize },
    SheetMissing { sheet: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReceipt {
    pub order_row: usize,
    pub line_item: LineItemOutcome,
}

/// Persists an order and its single line item.
pub struct OrderRecorder<'a> {
    workbook: &'a dyn Workbook,
    sheets: &'a SheetNames,
}

impl<'a> OrderRecorder<'a> {
    pub fn new(workbook: &'a dyn Workbook, sheets: &'a SheetNames) -> Self {
        Self { workbook, sheets }
    }

    /// Appends the order along `orders`' header order. Failing to append the
    /// order is an error; the line item is best effort and reported in the
    /// receipt.
    pub fn record(&self, order: &Order, orders: &OrderTable) -> Result<RecordReceipt, WorkbookError> {
        let cells = row_for_headers(orders.headers(), &order.to_row().cells());
        let order_row = self.workbook.append_row(orders.name(), cells)?;
        let line_item = self.record_line_item(order);
        Ok(RecordReceipt {
            order_row,
            line_item,
        })
    }

    fn record_line_item(&self, order: &Order) -> LineItemOutcome {
        let sheet = &self.sheets.items;
        let result = self.workbook.snapshot(sheet).and_then(|snapshot| {
            let Some(snapshot) = snapshot else {
                return Ok(None);
            };
            ItemColumns::resolve(&snapshot)?;
            let cells = row_for_headers(&snapshot.headers, &order.line_item().cells());
            self.workbook.append_row(sheet, cells).map(Some)
        });

        match result {
            Ok(Some(row)) => LineItemOutcome::Recorded { row },
            Ok(None) => LineItemOutcome::SheetMissing {
                sheet: sheet.clone(),
            },
            Err(e) => {
                warn!("Failed to record line item for {}: {}", order.order_id, e);
                LineItemOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;
    use crate::order::model::CatalogItem;
    use crate::workbook::layout::{items, orders};
    use crate::workbook::MemoryWorkbook;

    fn order(id: &str) -> Order {
        Order::pending(
            id.to_string(),
            CatalogItem {
                serial: "X1".into(),
                variant: "V1".into(),
                machine: "M-1".into(),
                ..Default::default()
            },
            parse_timestamp("2026-03-01 12:00:00").unwrap(),
            "external-trigger",
            "auto-generated",
        )
    }

    fn table(wb: &MemoryWorkbook) -> OrderTable {
        OrderTable::from_snapshot(wb.snapshot("Pedidos").unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_records_order_and_line_item() {
        let wb = MemoryWorkbook::new()
            .with_sheet("Pedidos", &orders::HEADERS, &[])
            .with_sheet("Itens", &items::HEADERS, &[]);
        let sheets = SheetNames::default();
        let receipt = OrderRecorder::new(&wb, &sheets)
            .record(&order("REQ-001"), &table(&wb))
            .unwrap();

        assert_eq!(receipt.order_row, 2);
        assert_eq!(receipt.line_item, LineItemOutcome::Recorded { row: 2 });

        let stored = wb.snapshot("Pedidos").unwrap().unwrap();
        assert_eq!(stored.cell(2, 0), "REQ-001");
        assert_eq!(stored.cell(2, 3), "M-1");
        assert_eq!(stored.cell(2, 10), "PENDENTE");
        let lines = wb.snapshot("Itens").unwrap().unwrap();
        assert_eq!(lines.rows[0], vec!["REQ-001", "X1", "1"]);
    }

    #[test]
    fn test_follows_sheet_header_order() {
        let wb = MemoryWorkbook::new().with_sheet(
            "Pedidos",
            &["Status", "Numero_Pedido", "Serial", "Data", "Semiacabado", "Extra"],
            &[],
        );
        let sheets = SheetNames::default();
        OrderRecorder::new(&wb, &sheets)
            .record(&order("REQ-002"), &table(&wb))
            .unwrap();
        let stored = wb.snapshot("Pedidos").unwrap().unwrap();
        assert_eq!(
            stored.rows[0],
            vec!["PENDENTE", "REQ-002", "X1", "2026-03-01 12:00:00", "V1", ""]
        );
    }

    #[test]
    fn test_missing_item_sheet_is_reported() {
        let wb = MemoryWorkbook::new().with_sheet("Pedidos", &orders::HEADERS, &[]);
        let sheets = SheetNames::default();
        let receipt = OrderRecorder::new(&wb, &sheets)
            .record(&order("REQ-001"), &table(&wb))
            .unwrap();
        assert_eq!(
            receipt.line_item,
            LineItemOutcome::SheetMissing {
                sheet: "Itens".into()
            }
        );
        assert_eq!(wb.snapshot("Pedidos").unwrap().unwrap().rows.len(), 1);
    }

    #[test]
    fn test_malformed_item_sheet_is_reported() {
        let wb = MemoryWorkbook::new()
            .with_sheet("Pedidos", &orders::HEADERS, &[])
            .with_sheet("Itens", &["Pedido"], &[]);
        let sheets = SheetNames::default();
        let receipt = OrderRecorder::new(&wb, &sheets)
            .record(&order("REQ-001"), &table(&wb))
            .unwrap();
        assert!(matches!(receipt.line_item, LineItemOutcome::Failed { .. }));
    }
}
