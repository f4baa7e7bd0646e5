use std::sync::LazyLock;

use regex::Regex;

use super::model::ORDER_ID_PREFIX;

/// Leading integer of an id segment, after optional whitespace and sign.
static LEADING_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\+?(\d+)").unwrap());

/// Derives the next order identifier from the ones already stored.
///
/// Only the caller's lock makes the result unique: two allocations over the
/// same snapshot return the same id.
pub struct SequenceAllocator;

impl SequenceAllocator {
    /// `REQ-` followed by one more than the largest numeric suffix among ids
    /// starting with `REQ-`, zero-padded to at least three digits.
    pub fn next_order_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
        let max = existing
            .into_iter()
            .filter(|id| id.starts_with(ORDER_ID_PREFIX))
            .map(suffix_number)
            .max()
            .unwrap_or(0);
        format_order_id(max.saturating_add(1))
    }
}

pub fn format_order_id(number: u64) -> String {
    format!("{}{:03}", ORDER_ID_PREFIX, number)
}

/// Number after the first `-`. Text after the leading digits is ignored
/// (`REQ-12abc` is 12); no digits at all reads as 0.
fn suffix_number(id: &str) -> u64 {
    id.split('-')
        .nth(1)
        .and_then(|segment| LEADING_INT.captures(segment))
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_starts_at_one() {
        assert_eq!(SequenceAllocator::next_order_id(Vec::<&str>::new()), "REQ-001");
    }

    #[test]
    fn test_max_plus_one() {
        let ids = ["REQ-001", "REQ-007", "REQ-003"];
        assert_eq!(SequenceAllocator::next_order_id(ids), "REQ-008");
    }

    #[test]
    fn test_foreign_and_malformed_ids() {
        let ids = ["ABC-999", "REQ-XYZ", "", "REQ-", "REQ-12abc", " REQ-500"];
        assert_eq!(SequenceAllocator::next_order_id(ids), "REQ-013");
    }

    #[test]
    fn test_padding_grows_past_three_digits() {
        assert_eq!(SequenceAllocator::next_order_id(["REQ-999"]), "REQ-1000");
        assert_eq!(SequenceAllocator::next_order_id(["REQ-0041"]), "REQ-042");
    }

    #[test]
    fn test_suffix_number() {
        assert_eq!(suffix_number("REQ-010"), 10);
        assert_eq!(suffix_number("REQ- 7"), 7);
        assert_eq!(suffix_number("REQ-+4"), 4);
        assert_eq!(suffix_number("REQ-4-2"), 4);
        assert_eq!(suffix_number("REQ"), 0);
    }
}
