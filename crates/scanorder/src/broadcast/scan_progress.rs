//! Scan progress broadcaster for real-time status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of scan processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanPhase {
    Queued,
    Processing,
    CheckingDuplicates,
    ResolvingItem,
    AllocatingOrder,
    Recording,
    Completed,
    Skipped,
    Failed,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanPhase::Queued => write!(f, "Queued"),
            ScanPhase::Processing => write!(f, "Processing"),
            ScanPhase::CheckingDuplicates => write!(f, "Checking duplicates"),
            ScanPhase::ResolvingItem => write!(f, "Resolving item"),
            ScanPhase::AllocatingOrder => write!(f, "Allocating order number"),
            ScanPhase::Recording => write!(f, "Recording order"),
            ScanPhase::Completed => write!(f, "Completed"),
            ScanPhase::Skipped => write!(f, "Skipped"),
            ScanPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress event for one scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanProgressEvent {
    pub job_id: String,
    /// Scan sheet row the event refers to.
    pub row: usize,
    pub serial: String,
    pub phase: ScanPhase,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Stored scan status label, set once the scan reaches a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_status: Option<String>,
    /// Order created or matched by this scan.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl ScanProgressEvent {
    pub fn new(job_id: &str, row: usize, serial: &str, phase: ScanPhase, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            row,
            serial: serial.to_string(),
            phase,
            message: message.to_string(),
            timestamp: Utc::now(),
            scan_status: None,
            order_id: None,
        }
    }
}

/// Broadcasts scan progress events for streaming.
#[derive(Clone)]
pub struct ScanProgressBroadcaster {
    sender: Arc<broadcast::Sender<ScanProgressEvent>>,
}

impl ScanProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: ScanProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one scan and announces it as queued.
    pub fn start_scan(&self, job_id: &str, row: usize, serial: &str) -> ScanProgressTracker {
        let tracker = ScanProgressTracker::new(job_id, row, serial, Arc::clone(&self.sender));
        tracker.update_phase(ScanPhase::Queued, "Scan queued for processing");
        tracker
    }

    pub fn sender(&self) -> Arc<broadcast::Sender<ScanProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for ScanProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Tracks progress for a single scan.
pub struct ScanProgressTracker {
    job_id: String,
    row: usize,
    serial: String,
    sender: Arc<broadcast::Sender<ScanProgressEvent>>,
}

impl ScanProgressTracker {
    pub fn new(
        job_id: &str,
        row: usize,
        serial: &str,
        sender: Arc<broadcast::Sender<ScanProgressEvent>>,
    ) -> Self {
        Self {
            job_id: job_id.to_string(),
            row,
            serial: serial.to_string(),
            sender,
        }
    }

    fn event(&self, phase: ScanPhase, message: &str) -> ScanProgressEvent {
        ScanProgressEvent::new(&self.job_id, self.row, &self.serial, phase, message)
    }

    pub fn update_phase(&self, phase: ScanPhase, message: &str) {
        let _ = self.sender.send(self.event(phase, message));
    }

    /// Terminal event. `phase` is `Completed` or `Failed`.
    pub fn finished(
        &self,
        phase: ScanPhase,
        scan_status: &str,
        message: &str,
        order_id: Option<&str>,
    ) {
        let mut event = self.event(phase, message);
        event.scan_status = Some(scan_status.to_string());
        event.order_id = order_id.map(str::to_string);
        let _ = self.sender.send(event);
    }

    pub fn skipped(&self, reason: &str) {
        let _ = self.sender.send(self.event(ScanPhase::Skipped, reason));
    }
}
