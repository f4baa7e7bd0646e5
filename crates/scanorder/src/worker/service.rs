use log::debug;

use crate::error::WorkerError;
use crate::pipeline::progress::{NoopProgress, ProgressReporter};
use crate::pipeline::ScanPipeline;
use crate::workbook::layout::{row_for_headers, scans};
use crate::workbook::{Workbook, WorkbookError};

use super::job::{ScanEvent, ScanResult, TriggerSource};
use super::sweep::Sweeper;
use super::trigger::{scan_event_from_edit, EditEvent};

/// Synchronous entry points into the pipeline for callers that do not run
/// a worker pool.
pub struct ScanService {
    pipeline: ScanPipeline,
}

impl ScanService {
    pub fn new(pipeline: ScanPipeline) -> Self {
        Self { pipeline }
    }

    pub fn pipeline(&self) -> &ScanPipeline {
        &self.pipeline
    }

    fn workbook(&self) -> &dyn Workbook {
        &**self.pipeline.workbook()
    }

    /// Registers a scan that did not come through the sheet: appends it as a
    /// new scan row and processes it right away.
    pub fn register(&self, serial: &str) -> Result<ScanResult, WorkbookError> {
        let sheet = &self.pipeline.config().sheets.scans;
        let snapshot = self
            .workbook()
            .snapshot(sheet)?
            .ok_or_else(|| WorkbookError::SheetNotFound(sheet.clone()))?;
        let received_at = self.pipeline.clock().now();

        if serial.trim().is_empty() {
            let event = ScanEvent::new(serial, snapshot.last_row().max(1) + 1, TriggerSource::Direct, received_at);
            return Ok(self.pipeline.run(event, &NoopProgress));
        }

        let cells = row_for_headers(&snapshot.headers, &[(scans::SERIAL, serial.to_string())]);
        let row = self.workbook().append_row(sheet, cells)?;
        debug!("Registered serial on scan row {}", row);

        let event = ScanEvent::new(serial, row, TriggerSource::Direct, received_at);
        Ok(self.pipeline.run(event, &NoopProgress))
    }

    /// Handles an edit notification. Edits outside the serial column of the
    /// scan sheet come back as skipped results.
    pub fn on_edit(
        &self,
        edit: &EditEvent,
        progress: &dyn ProgressReporter,
    ) -> Result<ScanResult, WorkbookError> {
        let sheet = &self.pipeline.config().sheets.scans;
        let serial_column = match self.workbook().snapshot(sheet)? {
            Some(snapshot) => snapshot.column_index(scans::SERIAL).map_or(1, |i| i + 1),
            None => 1,
        };
        let received_at = self.pipeline.clock().now();

        match scan_event_from_edit(edit, sheet, serial_column, received_at) {
            Ok(event) => Ok(self.pipeline.run(event, progress)),
            Err(reason) => {
                debug!("Ignoring edit: {}", reason);
                let event = ScanEvent::new(edit.value.clone(), edit.row, TriggerSource::Edit, received_at);
                Ok(ScanResult::skipped(&event, reason))
            }
        }
    }

    /// One sweep, processed in row order on the calling thread.
    pub fn sweep_once(&self, sweeper: &Sweeper) -> Result<Vec<ScanResult>, WorkerError> {
        let events = sweeper.collect()?;
        Ok(events
            .into_iter()
            .map(|event| self.pipeline.run(event, &NoopProgress))
            .collect())
    }
}
