pub mod config;
pub mod context;
pub mod cursor;
pub mod error;
pub mod lock;
pub mod outcome;
pub mod progress;
pub mod runner;

pub use config::PipelineConfig;
pub use context::ScanContext;
pub use cursor::IntakeCursor;
pub use error::{PipelineError, PipelineWarning};
pub use lock::OrderTableLock;
pub use outcome::{FailureKind, ScanOutcome, ScanStatus, SkipReason};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::ScanPipeline;
