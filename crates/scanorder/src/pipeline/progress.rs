use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::scan_progress::{ScanPhase, ScanProgressEvent, ScanProgressTracker};

use super::outcome::ScanStatus;

/// Events emitted by the pipeline during a run.
pub enum ProgressEvent {
    Phase {
        phase: ScanPhase,
        message: String,
    },
    Finished {
        status: ScanStatus,
        message: String,
        order_id: Option<String>,
    },
    Skipped {
        reason: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for tests and synchronous callers.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Bridges pipeline events to a scan progress broadcast channel.
pub struct BroadcastProgress {
    tracker: ScanProgressTracker,
}

impl BroadcastProgress {
    pub fn new(
        job_id: &str,
        row: usize,
        serial: &str,
        sender: Arc<broadcast::Sender<ScanProgressEvent>>,
    ) -> Self {
        Self {
            tracker: ScanProgressTracker::new(job_id, row, serial, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Phase { phase, message } => {
                self.tracker.update_phase(phase, &message);
            }
            ProgressEvent::Finished {
                status,
                message,
                order_id,
            } => {
                let phase = if status == ScanStatus::Error {
                    ScanPhase::Failed
                } else {
                    ScanPhase::Completed
                };
                self.tracker
                    .finished(phase, status.label(), &message, order_id.as_deref());
            }
            ProgressEvent::Skipped { reason } => {
                self.tracker.skipped(&reason);
            }
        }
    }
}
