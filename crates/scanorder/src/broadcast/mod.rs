//! Broadcasting modules for real-time event streaming.
//!
//! Any integration (a CLI, a web front end, a test) can subscribe to follow
//! scans as workers process them.

pub mod scan_progress;

pub use scan_progress::{ScanPhase, ScanProgressBroadcaster, ScanProgressEvent, ScanProgressTracker};
