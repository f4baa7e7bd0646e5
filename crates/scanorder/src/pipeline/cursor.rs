use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Row where the next scan should be entered: one past the last non-blank
/// scan row. Shared by every pipeline instance; clones observe each other.
#[derive(Debug, Clone, Default)]
pub struct IntakeCursor {
    next: Arc<AtomicUsize>,
}

impl IntakeCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.next.load(Ordering::SeqCst)
    }

    /// Points the cursor below a sheet whose last non-blank row is `last_row`.
    pub fn advance_past(&self, last_row: usize) -> usize {
        let next = last_row.max(1) + 1;
        self.next.store(next, Ordering::SeqCst);
        next
    }
}
