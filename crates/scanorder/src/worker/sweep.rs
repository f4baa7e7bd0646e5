//! Periodic pickup of scan rows that no edit trigger processed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::error::WorkerError;
use crate::order::model::match_key;
use crate::pipeline::outcome::{ScanStatus, BUSY_MESSAGE_PREFIX};
use crate::workbook::{cell, ScanColumns, SheetNames, Workbook};

use super::job::{ScanEvent, TriggerSource};
use super::pool::ScanQueue;

/// Finds unprocessed scan rows and claims them.
pub struct Sweeper {
    workbook: Arc<dyn Workbook>,
    sheets: SheetNames,
    clock: Arc<dyn Clock>,
    max_error_retries: u32,
    /// Retries spent per (row, serial) during this process's lifetime.
    retries: Mutex<HashMap<(usize, String), u32>>,
}

impl Sweeper {
    pub fn new(
        workbook: Arc<dyn Workbook>,
        sheets: SheetNames,
        clock: Arc<dyn Clock>,
        max_error_retries: u32,
    ) -> Self {
        Self {
            workbook,
            sheets,
            clock,
            max_error_retries,
            retries: Mutex::new(HashMap::new()),
        }
    }

    /// Rows with a serial and a blank status, plus busy-failed rows while
    /// their retry budget lasts. Each returned row is already marked
    /// PROCESSING so a concurrent sweep or edit cannot claim it again.
    pub fn collect(&self) -> Result<Vec<ScanEvent>, WorkerError> {
        let sheet = &self.sheets.scans;
        let snapshot = match self.workbook.snapshot(sheet) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("Scan sheet '{}' not found; nothing to sweep", sheet);
                return Ok(Vec::new());
            }
            Err(e) => return Err(WorkerError::SweepFailed(e.to_string())),
        };
        let columns =
            ScanColumns::resolve(&snapshot).map_err(|e| WorkerError::SweepFailed(e.to_string()))?;

        let mut events = Vec::new();
        for (row, cells) in snapshot.data_rows() {
            let serial = cell(cells, columns.serial);
            if serial.trim().is_empty() {
                continue;
            }
            let status = cell(cells, columns.status);
            let eligible = if status.trim().is_empty() {
                true
            } else if ScanStatus::parse(status) == Some(ScanStatus::Error) {
                self.take_retry(row, serial, cell(cells, columns.message))
            } else {
                false
            };
            if !eligible {
                continue;
            }

            // Only claim the row if nobody changed its status since the snapshot.
            let unchanged = |current: &str| current.trim() == status.trim();
            match self.workbook.set_cell_if(
                sheet,
                row,
                columns.status + 1,
                ScanStatus::Processing.label(),
                &unchanged,
            ) {
                Ok(true) => {}
                Ok(false) => {
                    debug!("Scan row {} was claimed elsewhere", row);
                    continue;
                }
                Err(e) => {
                    warn!("Could not claim scan row {}: {}", row, e);
                    continue;
                }
            }
            events.push(ScanEvent::new(
                serial,
                row,
                TriggerSource::Sweep,
                self.clock.now(),
            ));
        }

        if !events.is_empty() {
            info!("Sweep claimed {} scan rows", events.len());
        }
        Ok(events)
    }

    /// Hands a claimed row back, e.g. when it could not be enqueued. A row
    /// that already left PROCESSING is left alone.
    pub fn release(&self, event: &ScanEvent) -> Result<(), WorkerError> {
        let sheet = &self.sheets.scans;
        let snapshot = self
            .workbook
            .snapshot(sheet)
            .map_err(|e| WorkerError::SweepFailed(e.to_string()))?
            .ok_or_else(|| WorkerError::SweepFailed(format!("Sheet '{}' not found", sheet)))?;
        let columns =
            ScanColumns::resolve(&snapshot).map_err(|e| WorkerError::SweepFailed(e.to_string()))?;
        let in_flight = |current: &str| ScanStatus::parse(current) == Some(ScanStatus::Processing);
        self.workbook
            .set_cell_if(
                sheet,
                event.row,
                columns.status + 1,
                ScanStatus::Pending.label(),
                &in_flight,
            )
            .map(|_| ())
            .map_err(|e| WorkerError::SweepFailed(e.to_string()))
    }

    fn take_retry(&self, row: usize, serial: &str, message: &str) -> bool {
        if self.max_error_retries == 0 || !message.trim_start().starts_with(BUSY_MESSAGE_PREFIX) {
            return false;
        }
        let mut retries = self.retries.lock();
        let spent = retries.entry((row, match_key(serial))).or_insert(0);
        if *spent >= self.max_error_retries {
            return false;
        }
        *spent += 1;
        debug!("Retrying busy scan row {} (attempt {})", row, spent);
        true
    }
}

/// Runs the sweeper on an interval in a background thread.
pub struct SweepScheduler {
    sweeper: Arc<Sweeper>,
    queue: ScanQueue,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl SweepScheduler {
    pub fn new(sweeper: Arc<Sweeper>, queue: ScanQueue, interval: Duration) -> Self {
        Self {
            sweeper,
            queue,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the sweep loop in a background thread.
    /// Accepts a trigger receiver for manual sweep requests.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let sweeper = Arc::clone(&self.sweeper);
        let queue = self.queue.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!("Failed to start sweep runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            info!("Manual sweep triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    let events = match sweeper.collect() {
                        Ok(events) => events,
                        Err(e) => {
                            error!("Sweep failed: {}", e);
                            continue;
                        }
                    };
                    for event in events {
                        if let Err(e) = queue.submit(event.clone()) {
                            warn!("Could not enqueue scan row {}: {}", event.row, e);
                            if let Err(e) = sweeper.release(&event) {
                                error!("Could not release scan row {}: {}", event.row, e);
                            }
                        }
                    }
                }
            });
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
