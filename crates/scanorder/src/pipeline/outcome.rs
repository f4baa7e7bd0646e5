use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::clock::format_timestamp;

/// Prefix of the message stored for scans that lost the race for the order
/// table. The sweeper recognizes retryable rows by it.
pub const BUSY_MESSAGE_PREFIX: &str = "Order table busy";

/// Status written to a scan row. Stored with the sheet's labels; English
/// names are accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    Processing,
    Success,
    Warning,
    Error,
}

impl ScanStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ScanStatus::Pending => "",
            ScanStatus::Processing => "PROCESSANDO",
            ScanStatus::Success => "SUCESSO",
            ScanStatus::Warning => "AVISO",
            ScanStatus::Error => "ERRO",
        }
    }

    /// Unknown labels read as `None`; a blank cell is `Pending`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "" | "PENDENTE" | "PENDING" => Some(ScanStatus::Pending),
            "PROCESSANDO" | "PROCESSING" => Some(ScanStatus::Processing),
            "SUCESSO" | "SUCCESS" => Some(ScanStatus::Success),
            "AVISO" | "WARNING" => Some(ScanStatus::Warning),
            "ERRO" | "ERROR" => Some(ScanStatus::Error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScanStatus::Success | ScanStatus::Warning | ScanStatus::Error
        )
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanStatus::Pending => write!(f, "PENDING"),
            _ => f.write_str(self.label()),
        }
    }
}

/// Why an event produced no run at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum SkipReason {
    EmptySerial,
    HeaderRow,
    OtherSheet { sheet: String },
    OtherColumn { column: usize },
    /// Another run already marked the row PROCESSANDO.
    AlreadyClaimed { row: usize },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptySerial => write!(f, "empty serial"),
            SkipReason::HeaderRow => write!(f, "edit on the header row"),
            SkipReason::OtherSheet { sheet } => write!(f, "edit on sheet '{}'", sheet),
            SkipReason::OtherColumn { column } => write!(f, "edit in column {}", column),
            SkipReason::AlreadyClaimed { row } => {
                write!(f, "row {} is already being processed by another run", row)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Serial absent from the catalog.
    Lookup,
    /// A required sheet or column is missing.
    Schema,
    /// The order-table lock could not be taken in time.
    Busy,
    /// Anything else: store errors, panics.
    Fault,
}

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Skipped(SkipReason),
    Created {
        order_id: String,
    },
    Duplicate {
        order_id: String,
        variant: String,
        prior_created_at: NaiveDateTime,
        window_secs: u64,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl ScanOutcome {
    /// Terminal status written for this outcome; `None` for skips.
    pub fn status(&self) -> Option<ScanStatus> {
        match self {
            ScanOutcome::Skipped(_) => None,
            ScanOutcome::Created { .. } => Some(ScanStatus::Success),
            ScanOutcome::Duplicate { .. } => Some(ScanStatus::Warning),
            ScanOutcome::Failed { .. } => Some(ScanStatus::Error),
        }
    }

    /// Order the scan row links to: the new one, or the one it duplicates.
    pub fn linked_order_id(&self) -> Option<&str> {
        match self {
            ScanOutcome::Created { order_id } | ScanOutcome::Duplicate { order_id, .. } => {
                Some(order_id)
            }
            _ => None,
        }
    }

    /// Operator-facing message stored in the scan row.
    pub fn message(&self) -> String {
        match self {
            ScanOutcome::Skipped(reason) => format!("Skipped: {}", reason),
            ScanOutcome::Created { order_id } => {
                format!("Order {} created successfully", order_id)
            }
            ScanOutcome::Duplicate {
                order_id,
                variant,
                prior_created_at,
                window_secs,
            } => format!(
                "Order {} already exists for this item and variant {} (created at {}). \
                 Wait {} seconds to create a new order.",
                order_id,
                variant,
                format_timestamp(prior_created_at),
                window_secs
            ),
            ScanOutcome::Failed { message, .. } => message.clone(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScanOutcome::Failed {
                kind: FailureKind::Busy,
                ..
            }
        )
    }
}
