pub mod job;
pub mod pool;
pub mod service;
pub mod sweep;
pub mod trigger;

pub use job::{ScanEvent, ScanResult, TriggerSource};
pub use pool::{ScanQueue, WorkerPool};
pub use service::ScanService;
pub use sweep::{SweepScheduler, Sweeper};
pub use trigger::{scan_event_from_edit, EditEvent};

// Re-export crossbeam_channel for callers that drain their own queue
pub use crossbeam_channel;
