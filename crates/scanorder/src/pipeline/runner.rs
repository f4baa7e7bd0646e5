use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::broadcast::scan_progress::ScanPhase;
use crate::catalog::{CatalogIndex, ItemResolver};
use crate::clock::{format_timestamp, Clock};
use crate::order::{
    DuplicateCheck, DuplicateGuard, LineItemOutcome, Order, OrderRecorder, OrderTable,
    SequenceAllocator,
};
use crate::worker::job::{ScanEvent, ScanResult, TriggerSource};
use crate::workbook::{ScanColumns, Workbook};

use super::config::PipelineConfig;
use super::context::ScanContext;
use super::cursor::IntakeCursor;
use super::error::{PipelineError, PipelineWarning};
use super::lock::OrderTableLock;
use super::outcome::{ScanOutcome, ScanStatus, SkipReason};
use super::progress::{ProgressEvent, ProgressReporter};

/// Turns one scan event into exactly one terminal scan status.
///
/// Clones share the workbook, lock, clock and intake cursor, so every worker
/// can hold its own instance.
#[derive(Clone)]
pub struct ScanPipeline {
    config: Arc<PipelineConfig>,
    workbook: Arc<dyn Workbook>,
    lock: OrderTableLock,
    clock: Arc<dyn Clock>,
    cursor: IntakeCursor,
}

impl ScanPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        workbook: Arc<dyn Workbook>,
        lock: OrderTableLock,
        clock: Arc<dyn Clock>,
        cursor: IntakeCursor,
    ) -> Self {
        Self {
            config,
            workbook,
            lock,
            clock,
            cursor,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn workbook(&self) -> &Arc<dyn Workbook> {
        &self.workbook
    }

    pub fn lock(&self) -> &OrderTableLock {
        &self.lock
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cursor(&self) -> &IntakeCursor {
        &self.cursor
    }

    /// Run the full pipeline for a single scan.
    pub fn run(&self, event: ScanEvent, progress: &dyn ProgressReporter) -> ScanResult {
        let _scan_span = info_span!("scan",
            job_id = %event.id,
            row = event.row,
            serial = %event.serial.trim(),
            source = %event.source,
        )
        .entered();

        let mut ctx = ScanContext::new(event);

        // Step 1: Validate input
        if ctx.serial.is_empty() {
            debug!("Ignoring scan with empty serial");
            let reason = SkipReason::EmptySerial;
            progress.report(ProgressEvent::Skipped {
                reason: reason.to_string(),
            });
            return ScanResult::skipped(&ctx.event, reason);
        }

        // Step 2: Claim the scan row
        {
            let _step = info_span!("mark_processing").entered();
            progress.report(ProgressEvent::Phase {
                phase: ScanPhase::Processing,
                message: "Recording scan receipt...".to_string(),
            });
            match self.step_mark_processing(&mut ctx) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    info!("Scan row is being processed by another run; skipping");
                    progress.report(ProgressEvent::Skipped {
                        reason: reason.to_string(),
                    });
                    return ScanResult::skipped(&ctx.event, reason);
                }
                Err(e) => return self.finish(ctx, Err(e), progress),
            }
        }

        // Steps 3-7: everything that reads or appends orders
        let result = catch_unwind(AssertUnwindSafe(|| self.run_locked(&mut ctx, progress)))
            .unwrap_or_else(|payload| Err(PipelineError::Panicked(panic_message(&*payload))));

        self.finish(ctx, result, progress)
    }

    fn run_locked(
        &self,
        ctx: &mut ScanContext,
        progress: &dyn ProgressReporter,
    ) -> Result<ScanOutcome, PipelineError> {
        let timeout = self.config.lock_timeout;
        let _guard = self
            .lock
            .acquire_shared(&*self.workbook, &self.config.sheets.orders, timeout)?
            .ok_or(PipelineError::LockTimeout {
                waited_ms: timeout.as_millis(),
            })?;

        // Step 3: Duplicate suppression
        {
            let _step = info_span!("check_duplicates").entered();
            progress.report(ProgressEvent::Phase {
                phase: ScanPhase::CheckingDuplicates,
                message: "Checking for recent orders...".to_string(),
            });
            self.step_load_tables(ctx)?;
            if let Some(outcome) = self.step_check_duplicates(ctx) {
                return Ok(outcome);
            }
        }

        // Step 4: Resolve the item
        {
            let _step = info_span!("resolve_item").entered();
            progress.report(ProgressEvent::Phase {
                phase: ScanPhase::ResolvingItem,
                message: "Looking up serial in reference data...".to_string(),
            });
            self.step_resolve_item(ctx)?;
        }

        // Steps 5+6: Allocate the order
        {
            let _step = info_span!("allocate_order").entered();
            progress.report(ProgressEvent::Phase {
                phase: ScanPhase::AllocatingOrder,
                message: "Allocating order number...".to_string(),
            });
            self.step_allocate_order(ctx)?;
        }

        // Step 7: Persist order and line item
        let _step = info_span!("record_order").entered();
        progress.report(ProgressEvent::Phase {
            phase: ScanPhase::Recording,
            message: "Recording order...".to_string(),
        });
        self.step_record_order(ctx)
    }

    /// Marks the row PROCESSING unless another run already owns it. Sweep
    /// events arrive with the row claimed by the sweeper; any other event
    /// must find the row not yet in flight.
    fn step_mark_processing(&self, ctx: &mut ScanContext) -> Result<Option<SkipReason>, PipelineError> {
        let sheet = &self.config.sheets.scans;
        let snapshot = self
            .workbook
            .snapshot(sheet)?
            .ok_or_else(|| PipelineError::SheetMissing(sheet.clone()))?;
        let columns = ScanColumns::resolve(&snapshot)?;
        ctx.scan_columns = Some(columns);

        let claimed_by_sweep = ctx.event.source == TriggerSource::Sweep;
        let claimable = |current: &str| match ScanStatus::parse(current) {
            Some(ScanStatus::Processing) => claimed_by_sweep,
            _ if claimed_by_sweep => current.trim().is_empty(),
            _ => true,
        };
        let row = ctx.event.row;
        if !self.workbook.set_cell_if(
            sheet,
            row,
            columns.status + 1,
            ScanStatus::Processing.label(),
            &claimable,
        )? {
            return Ok(Some(SkipReason::AlreadyClaimed { row }));
        }

        let received_at = format_timestamp(&ctx.event.received_at);
        let mut cells = vec![(columns.read_at + 1, received_at.as_str())];
        if ctx.event.serial != ctx.serial {
            cells.push((columns.serial + 1, ctx.serial.as_str()));
        }
        self.workbook.set_cells(sheet, row, &cells)?;
        Ok(None)
    }

    fn step_load_tables(&self, ctx: &mut ScanContext) -> Result<(), PipelineError> {
        let sheets = &self.config.sheets;
        ctx.catalog = match self.workbook.snapshot(&sheets.catalog)? {
            Some(snapshot) => Some(CatalogIndex::from_snapshot(&snapshot)?),
            None => None,
        };
        ctx.orders = match self.workbook.snapshot(&sheets.orders)? {
            Some(snapshot) => Some(OrderTable::from_snapshot(snapshot)?),
            None => None,
        };
        Ok(())
    }

    fn step_check_duplicates(&self, ctx: &ScanContext) -> Option<ScanOutcome> {
        let guard = DuplicateGuard::new(self.config.duplicate_window_secs);
        let check = guard.check(
            &ctx.serial,
            ctx.catalog.as_ref(),
            ctx.orders.as_ref(),
            self.clock.now(),
        );
        match check {
            DuplicateCheck::Clear => None,
            DuplicateCheck::Duplicate(found) => {
                info!(
                    order_id = %found.order_id,
                    variant = %found.variant,
                    "Recent order exists for this item; not creating another"
                );
                Some(ScanOutcome::Duplicate {
                    order_id: found.order_id,
                    variant: found.variant,
                    prior_created_at: found.prior_created_at,
                    window_secs: guard.window_secs(),
                })
            }
        }
    }

    fn step_resolve_item(&self, ctx: &mut ScanContext) -> Result<(), PipelineError> {
        let catalog = ctx
            .catalog
            .as_ref()
            .ok_or_else(|| PipelineError::SheetMissing(self.config.sheets.catalog.clone()))?;
        let item = ItemResolver::new(catalog).resolve(&ctx.serial)?;
        ctx.item = Some(item);
        Ok(())
    }

    fn step_allocate_order(&self, ctx: &mut ScanContext) -> Result<(), PipelineError> {
        let orders = ctx
            .orders
            .as_ref()
            .ok_or_else(|| PipelineError::SheetMissing(self.config.sheets.orders.clone()))?;
        let Some(item) = ctx.item.take() else {
            return Err(PipelineError::ItemNotFound(crate::catalog::ItemNotFound {
                serial: ctx.serial.clone(),
            }));
        };

        let order_id = SequenceAllocator::next_order_id(orders.order_ids());
        debug!(order_id = %order_id, "Allocated order number");
        ctx.order = Some(Order::pending(
            order_id,
            item,
            ctx.event.received_at,
            &self.config.requested_by,
            &self.config.notes,
        ));
        Ok(())
    }

    fn step_record_order(&self, ctx: &mut ScanContext) -> Result<ScanOutcome, PipelineError> {
        let sheet = &self.config.sheets.orders;
        let (Some(order), Some(orders)) = (ctx.order.as_ref(), ctx.orders.as_ref()) else {
            return Err(PipelineError::SheetMissing(sheet.clone()));
        };

        let receipt = OrderRecorder::new(&*self.workbook, &self.config.sheets).record(order, orders)?;
        info!(order_id = %order.order_id, row = receipt.order_row, "Order recorded");

        match receipt.line_item {
            LineItemOutcome::Recorded { row } => {
                debug!(row, "Line item recorded");
            }
            LineItemOutcome::SheetMissing { sheet } => {
                warn!(sheet = %sheet, "Line-item sheet missing; order has no line item");
                ctx.warnings
                    .push(PipelineWarning::LineItemSheetMissing { sheet });
            }
            LineItemOutcome::Failed { error } => {
                warn!(error = %error, "Line item not recorded");
                ctx.warnings.push(PipelineWarning::LineItemFailed {
                    order_id: order.order_id.clone(),
                    error,
                });
            }
        }

        Ok(ScanOutcome::Created {
            order_id: order.order_id.clone(),
        })
    }

    /// Steps 8-10: terminal status write, cursor, result.
    fn finish(
        &self,
        mut ctx: ScanContext,
        result: Result<ScanOutcome, PipelineError>,
        progress: &dyn ProgressReporter,
    ) -> ScanResult {
        let outcome = match result.map_err(PipelineError::classify) {
            Ok(outcome) => outcome,
            Err(e) => {
                let kind = e.kind();
                warn!(kind = ?kind, "Scan failed: {}", e);
                ScanOutcome::Failed {
                    kind,
                    message: e.to_string(),
                }
            }
        };
        let message = outcome.message();

        {
            let _step = info_span!("write_status").entered();
            if let Err(e) = self.write_terminal(&ctx, &outcome, &message) {
                error!("Could not write terminal status to scan row {}: {}", ctx.event.row, e);
                ctx.warnings.push(PipelineWarning::StatusWriteFailed {
                    row: ctx.event.row,
                    error: e.to_string(),
                });
            }
        }

        let next_intake_row = match self.workbook.snapshot(&self.config.sheets.scans) {
            Ok(Some(snapshot)) => Some(self.cursor.advance_past(snapshot.last_row())),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not advance intake cursor: {}", e);
                None
            }
        };

        if let Some(status) = outcome.status() {
            progress.report(ProgressEvent::Finished {
                status,
                message,
                order_id: outcome.linked_order_id().map(str::to_string),
            });
        }

        let mut result = ScanResult::new(&ctx.event, outcome);
        result.warnings = ctx.warnings;
        result.next_intake_row = next_intake_row;
        result
    }

    fn write_terminal(
        &self,
        ctx: &ScanContext,
        outcome: &ScanOutcome,
        message: &str,
    ) -> Result<(), PipelineError> {
        let Some(status) = outcome.status() else {
            return Ok(());
        };
        let sheet = &self.config.sheets.scans;
        let columns = match ctx.scan_columns {
            Some(columns) => columns,
            None => {
                let snapshot = self
                    .workbook
                    .snapshot(sheet)?
                    .ok_or_else(|| PipelineError::SheetMissing(sheet.clone()))?;
                ScanColumns::resolve(&snapshot)?
            }
        };

        let cells = [
            (columns.status + 1, status.label()),
            (columns.message + 1, message),
            (columns.order_id + 1, outcome.linked_order_id().unwrap_or("")),
        ];
        self.workbook.set_cells(sheet, ctx.event.row, &cells)?;
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unexpected panic".to_string())
}
