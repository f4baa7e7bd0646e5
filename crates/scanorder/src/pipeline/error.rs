use thiserror::Error;

use crate::catalog::ItemNotFound;
use crate::workbook::WorkbookError;

use super::outcome::FailureKind;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    ItemNotFound(#[from] ItemNotFound),

    #[error("Sheet '{0}' not found")]
    SheetMissing(String),

    #[error("Order table busy (lock not acquired within {waited_ms} ms); scan again to retry")]
    LockTimeout { waited_ms: u128 },

    #[error("Order table busy (store locked by another process: {0}); scan again to retry")]
    StoreBusy(WorkbookError),

    #[error("Processing error: {0}")]
    Workbook(#[from] WorkbookError),

    #[error("Processing error: {0}")]
    Panicked(String),
}

impl PipelineError {
    /// Store errors caused by another writer holding SQLite's lock become
    /// `StoreBusy`, so they read and retry like a lock timeout.
    pub fn classify(self) -> Self {
        match self {
            PipelineError::Workbook(e) if e.is_busy() => PipelineError::StoreBusy(e),
            other => other,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::ItemNotFound(_) => FailureKind::Lookup,
            PipelineError::SheetMissing(_)
            | PipelineError::Workbook(WorkbookError::SheetNotFound(_))
            | PipelineError::Workbook(WorkbookError::MissingColumn { .. }) => FailureKind::Schema,
            PipelineError::LockTimeout { .. } | PipelineError::StoreBusy(_) => FailureKind::Busy,
            PipelineError::Workbook(_) | PipelineError::Panicked(_) => FailureKind::Fault,
        }
    }
}

/// Non-fatal problems recorded alongside a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineWarning {
    LineItemSheetMissing { sheet: String },
    LineItemFailed { order_id: String, error: String },
    StatusWriteFailed { row: usize, error: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::LineItemSheetMissing { sheet } => {
                write!(f, "line-item sheet '{}' not found", sheet)
            }
            PipelineWarning::LineItemFailed { order_id, error } => {
                write!(f, "line item for {} not recorded: {}", order_id, error)
            }
            PipelineWarning::StatusWriteFailed { row, error } => {
                write!(f, "status of scan row {} not written: {}", row, error)
            }
        }
    }
}
