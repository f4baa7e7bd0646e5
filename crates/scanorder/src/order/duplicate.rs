use chrono::NaiveDateTime;
use tracing::debug;

use crate::catalog::CatalogIndex;
use crate::clock::parse_timestamp;

use super::model::match_key;
use super::OrderTable;

/// The prior order that made a scan a duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateMatch {
    pub order_id: String,
    pub variant: String,
    pub prior_created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck {
    Clear,
    Duplicate(DuplicateMatch),
}

impl DuplicateCheck {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DuplicateCheck::Duplicate(_))
    }
}

/// Suppresses a scan when a recent, non-cancelled order exists for the same
/// serial and variant.
#[derive(Debug, Clone, Copy)]
pub struct DuplicateGuard {
    window_secs: u64,
}

impl DuplicateGuard {
    pub fn new(window_secs: u64) -> Self {
        Self { window_secs }
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    /// Never fails: a missing catalog or order table, an unknown serial or a
    /// blank variant all mean "not a duplicate". Order rows with unparseable
    /// dates are ignored. The window is inclusive and measured in either
    /// direction, so clock skew between writers cannot hide a match.
    pub fn check(
        &self,
        serial: &str,
        catalog: Option<&CatalogIndex>,
        orders: Option<&OrderTable>,
        now: NaiveDateTime,
    ) -> DuplicateCheck {
        let (Some(catalog), Some(orders)) = (catalog, orders) else {
            return DuplicateCheck::Clear;
        };
        let Some(variant) = catalog.variant_of(serial) else {
            return DuplicateCheck::Clear;
        };

        let serial_key = match_key(serial);
        let variant_key = match_key(variant);
        let window_ms = self.window_secs.saturating_mul(1000).min(i64::MAX as u64) as i64;

        for entry in orders.entries() {
            if match_key(entry.serial()) != serial_key || match_key(entry.variant()) != variant_key {
                continue;
            }
            if entry.status().is_cancelled() {
                continue;
            }
            let Some(created_at) = parse_timestamp(entry.created_at()) else {
                debug!(row = entry.row, "Skipping order row with unreadable date");
                continue;
            };
            let elapsed_ms = (now - created_at).num_milliseconds().abs();
            if elapsed_ms <= window_ms {
                return DuplicateCheck::Duplicate(DuplicateMatch {
                    order_id: entry.order_id().trim().to_string(),
                    variant: variant.trim().to_string(),
                    prior_created_at: created_at,
                });
            }
        }
        DuplicateCheck::Clear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::model::CatalogItem;
    use crate::workbook::layout::orders::HEADERS;
    use crate::workbook::SheetSnapshot;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn catalog(variant: &str) -> CatalogIndex {
        CatalogIndex::from_items(vec![CatalogItem {
            serial: "X1".into(),
            variant: variant.into(),
            ..Default::default()
        }])
    }

    /// Order rows as (id, created, serial, variant, status).
    fn orders(rows: &[(&str, &str, &str, &str, &str)]) -> OrderTable {
        let headers: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
        let rows = rows
            .iter()
            .map(|(id, created, serial, variant, status)| {
                let mut row = vec![String::new(); 20];
                row[0] = id.to_string();
                row[1] = created.to_string();
                row[2] = serial.to_string();
                row[8] = variant.to_string();
                row[10] = status.to_string();
                row
            })
            .collect();
        OrderTable::from_snapshot(SheetSnapshot::new("Pedidos", headers, rows)).unwrap()
    }

    #[test]
    fn test_match_within_window() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[("REQ-004", "2026-01-01 10:00:00", "X1", "V1", "PENDENTE")]);
        let check = guard.check("x1", Some(&catalog("V1")), Some(&table), ts("2026-01-01 10:00:05"));
        let DuplicateCheck::Duplicate(found) = check else {
            panic!("expected duplicate");
        };
        assert_eq!(found.order_id, "REQ-004");
        assert_eq!(found.variant, "V1");
        assert_eq!(found.prior_created_at, ts("2026-01-01 10:00:00"));
    }

    #[test]
    fn test_window_is_inclusive_and_symmetric() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[("REQ-001", "2026-01-01 10:00:10", "X1", "V1", "PENDENTE")]);
        let cat = catalog("V1");
        assert!(guard
            .check("X1", Some(&cat), Some(&table), ts("2026-01-01 10:00:20"))
            .is_duplicate());
        // Order stamped in the "future" relative to this writer.
        assert!(guard
            .check("X1", Some(&cat), Some(&table), ts("2026-01-01 10:00:00"))
            .is_duplicate());
        assert!(!guard
            .check("X1", Some(&cat), Some(&table), ts("2026-01-01 10:00:21"))
            .is_duplicate());
    }

    #[test]
    fn test_cancelled_orders_do_not_count() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[
            ("REQ-001", "2026-01-01 10:00:00", "X1", "V1", " cancelado "),
            ("REQ-002", "2026-01-01 10:00:00", "X1", "V1", "CANCELLED"),
        ]);
        assert!(!guard
            .check("X1", Some(&catalog("V1")), Some(&table), ts("2026-01-01 10:00:01"))
            .is_duplicate());
    }

    #[test]
    fn test_variant_must_match() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[("REQ-001", "2026-01-01 10:00:00", "X1", "v2", "PENDENTE")]);
        let now = ts("2026-01-01 10:00:01");
        assert!(!guard.check("X1", Some(&catalog("V1")), Some(&table), now).is_duplicate());
        assert!(guard.check("X1", Some(&catalog("V2")), Some(&table), now).is_duplicate());
    }

    #[test]
    fn test_blank_variant_or_unknown_serial_is_clear() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[("REQ-001", "2026-01-01 10:00:00", "X1", "", "PENDENTE")]);
        let now = ts("2026-01-01 10:00:01");
        assert!(!guard.check("X1", Some(&catalog("")), Some(&table), now).is_duplicate());
        assert!(!guard.check("ZZ", Some(&catalog("V1")), Some(&table), now).is_duplicate());
    }

    #[test]
    fn test_missing_tables_are_clear() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[]);
        let now = ts("2026-01-01 10:00:01");
        assert_eq!(guard.check("X1", None, Some(&table), now), DuplicateCheck::Clear);
        assert_eq!(guard.check("X1", Some(&catalog("V1")), None, now), DuplicateCheck::Clear);
    }

    #[test]
    fn test_unparseable_dates_are_ignored() {
        let guard = DuplicateGuard::new(10);
        let table = orders(&[
            ("REQ-001", "yesterday", "X1", "V1", "PENDENTE"),
            ("REQ-002", "", "X1", "V1", "PENDENTE"),
        ]);
        assert!(!guard
            .check("X1", Some(&catalog("V1")), Some(&table), ts("2026-01-01 10:00:01"))
            .is_duplicate());
    }

    #[test]
    fn test_zero_window_matches_same_second_only() {
        let guard = DuplicateGuard::new(0);
        let table = orders(&[("REQ-001", "2026-01-01 10:00:00", "X1", "V1", "PENDENTE")]);
        let cat = catalog("V1");
        assert!(guard
            .check("X1", Some(&cat), Some(&table), ts("2026-01-01 10:00:00"))
            .is_duplicate());
        assert!(!guard
            .check("X1", Some(&cat), Some(&table), ts("2026-01-01 10:00:01"))
            .is_duplicate());
    }
}
