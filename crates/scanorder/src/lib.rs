pub mod broadcast;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod order;
pub mod pipeline;
pub mod workbook;
pub mod worker;

pub use broadcast::{ScanPhase, ScanProgressBroadcaster, ScanProgressEvent};
pub use catalog::{import_csv, CatalogIndex, ItemResolver};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use error::{ConfigError, Result, ScanOrderError, WorkerError};
pub use order::{
    DuplicateGuard, OrderQuery, OrderRecorder, OrderStatus, OrderUpdater, SequenceAllocator,
};
pub use pipeline::{
    IntakeCursor, OrderTableLock, PipelineConfig, ScanOutcome, ScanPipeline, ScanStatus,
};
pub use workbook::{ensure_layout, MemoryWorkbook, SheetNames, Workbook, WorkbookError};
pub use worker::{ScanEvent, ScanResult, ScanService, SweepScheduler, Sweeper, WorkerPool};
