use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scanorder::{ScanProgressBroadcaster, ScanProgressEvent, SweepScheduler, WorkerPool};
use tokio::sync::broadcast;

use super::{print_result, AppContext};

/// Runs the worker pool and sweep scheduler until Ctrl-C. With `progress`,
/// every phase change of every scan is printed as it happens.
pub fn run(ctx: &AppContext, progress: bool) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl-C handler")?;

    let broadcaster = progress.then(ScanProgressBroadcaster::default);
    let printer = broadcaster.as_ref().map(|b| {
        let mut rx = b.subscribe();
        std::thread::spawn(move || loop {
            match rx.blocking_recv() {
                Ok(event) => println!("{}", progress_line(&event)),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("Progress output fell behind; {} events dropped", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        })
    });

    let pool = WorkerPool::with_progress_sender(
        ctx.pipeline(),
        ctx.config.worker_count,
        broadcaster.as_ref().map(ScanProgressBroadcaster::sender),
    );

    let (trigger_tx, trigger_rx) = broadcast::channel(4);
    let scheduler = if ctx.config.sweep.enabled {
        let scheduler = SweepScheduler::new(
            Arc::new(ctx.sweeper()),
            pool.queue(),
            Duration::from_secs(ctx.config.sweep.interval_secs),
        );
        let handle = scheduler.start(trigger_rx);
        // Pick up whatever accumulated while nothing was running.
        let _ = trigger_tx.send(());
        Some((scheduler, handle))
    } else {
        log::info!("Periodic sweep disabled");
        None
    };

    println!(
        "Serving {} with {} workers. Press Ctrl-C to stop.",
        ctx.database_path.display(),
        ctx.config.worker_count
    );

    // Results must be drained: the result channel is bounded and workers
    // block once it fills up.
    while running.load(Ordering::SeqCst) {
        if let Some(result) = pool.recv_result_timeout(Duration::from_millis(200)) {
            print_result(&result);
        }
    }

    log::info!("Shutting down...");
    if let Some((scheduler, handle)) = scheduler {
        scheduler.stop();
        let _ = trigger_tx.send(());
        if handle.join().is_err() {
            log::error!("Sweep scheduler panicked");
        }
    }

    pool.shutdown();
    while let Some(result) = pool.try_recv_result() {
        print_result(&result);
    }
    pool.wait();

    // Last sender gone: the printer drains what is left and exits.
    drop(broadcaster);
    if let Some(printer) = printer {
        if printer.join().is_err() {
            log::error!("Progress printer panicked");
        }
    }

    Ok(())
}

fn progress_line(event: &ScanProgressEvent) -> String {
    let mut line = format!(
        "  [row {}] {}: {}",
        event.row,
        event.serial.trim(),
        event.phase
    );
    if !event.message.is_empty() {
        line.push_str(&format!(" ({})", event.message));
    }
    if let Some(order_id) = &event.order_id {
        line.push_str(&format!(" -> {}", order_id));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanorder::ScanPhase;

    #[test]
    fn test_progress_line() {
        let mut event = ScanProgressEvent::new("job-1", 4, " X1 ", ScanPhase::Completed, "Order created");
        event.order_id = Some("REQ-007".into());
        assert_eq!(progress_line(&event), "  [row 4] X1: Completed (Order created) -> REQ-007");

        let event = ScanProgressEvent::new("job-2", 5, "X2", ScanPhase::Queued, "");
        assert_eq!(progress_line(&event), "  [row 5] X2: Queued");
    }
}
