use chrono::NaiveDateTime;
use serde::Serialize;

use crate::pipeline::error::PipelineWarning;
use crate::pipeline::outcome::{ScanOutcome, ScanStatus, SkipReason};

/// Which producer created a scan event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// A cell edit on the scan sheet.
    Edit,
    /// The periodic sweep of unprocessed rows.
    Sweep,
    /// Direct registration that appended its own scan row.
    Direct,
}

impl std::fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerSource::Edit => write!(f, "edit"),
            TriggerSource::Sweep => write!(f, "sweep"),
            TriggerSource::Direct => write!(f, "direct"),
        }
    }
}

/// One scan to process. Consumed exactly once.
#[derive(Debug, Clone)]
pub struct ScanEvent {
    pub id: String,
    /// Serial as entered, untrimmed.
    pub serial: String,
    /// 1-based scan sheet row.
    pub row: usize,
    pub source: TriggerSource,
    pub received_at: NaiveDateTime,
}

impl ScanEvent {
    pub fn new(serial: impl Into<String>, row: usize, source: TriggerSource, received_at: NaiveDateTime) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            serial: serial.into(),
            row,
            source,
            received_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub job_id: String,
    pub row: usize,
    pub serial: String,
    pub source: TriggerSource,
    pub outcome: ScanOutcome,
    pub warnings: Vec<PipelineWarning>,
    /// Intake cursor after the run; `None` when nothing was written.
    pub next_intake_row: Option<usize>,
}

impl ScanResult {
    pub fn new(event: &ScanEvent, outcome: ScanOutcome) -> Self {
        Self {
            job_id: event.id.clone(),
            row: event.row,
            serial: event.serial.clone(),
            source: event.source,
            outcome,
            warnings: Vec::new(),
            next_intake_row: None,
        }
    }

    pub fn skipped(event: &ScanEvent, reason: SkipReason) -> Self {
        Self::new(event, ScanOutcome::Skipped(reason))
    }

    pub fn status(&self) -> Option<ScanStatus> {
        self.outcome.status()
    }

    pub fn message(&self) -> String {
        self.outcome.message()
    }

    pub fn order_id(&self) -> Option<&str> {
        self.outcome.linked_order_id()
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some(ScanStatus::Success)
    }
}
