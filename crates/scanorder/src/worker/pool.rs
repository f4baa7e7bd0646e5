use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};
use tokio::sync::broadcast;

use crate::broadcast::scan_progress::{ScanPhase, ScanProgressEvent};
use crate::error::WorkerError;
use crate::pipeline::progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
use crate::pipeline::ScanPipeline;
use crate::worker::job::{ScanEvent, ScanResult};

/// Producer handle onto a worker pool's queue. Cheap to clone; the edit
/// trigger and the sweep scheduler each hold one.
#[derive(Clone)]
pub struct ScanQueue {
    sender: Sender<ScanEvent>,
    shutdown: Arc<AtomicBool>,
}

impl ScanQueue {
    /// Wraps a channel whose receiving end the caller drains itself.
    pub fn from_sender(sender: Sender<ScanEvent>) -> Self {
        Self {
            sender,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Blocks while the queue is full.
    pub fn submit(&self, event: ScanEvent) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }
        self.sender
            .send(event)
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

pub struct WorkerPool {
    queue: ScanQueue,
    result_receiver: Receiver<ScanResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    /// Kept so the progress channel outlives every worker.
    #[allow(dead_code)]
    progress_sender: Option<Arc<broadcast::Sender<ScanProgressEvent>>>,
}

impl WorkerPool {
    pub fn new(pipeline: ScanPipeline, worker_count: usize) -> Self {
        Self::with_progress_sender(pipeline, worker_count, None)
    }

    /// Creates a pool whose workers report progress on `progress_sender`.
    /// A `worker_count` of 0 starts one worker.
    pub fn with_progress_sender(
        pipeline: ScanPipeline,
        worker_count: usize,
        progress_sender: Option<Arc<broadcast::Sender<ScanProgressEvent>>>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let (job_sender, job_receiver) = bounded::<ScanEvent>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<ScanResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = pipeline.clone();
            let worker_progress = progress_sender.clone();

            let handle = thread::spawn(move || {
                run_worker(
                    worker_id,
                    job_rx,
                    result_tx,
                    shutdown_flag,
                    worker_pipeline,
                    worker_progress,
                );
            });

            workers.push(handle);
        }

        info!("Started {} scan workers", worker_count);

        Self {
            queue: ScanQueue {
                sender: job_sender,
                shutdown: Arc::clone(&shutdown),
            },
            result_receiver,
            workers,
            shutdown,
            progress_sender,
        }
    }

    pub fn submit(&self, event: ScanEvent) -> Result<(), WorkerError> {
        self.queue.submit(event)
    }

    pub fn queue(&self) -> ScanQueue {
        self.queue.clone()
    }

    pub fn try_recv_result(&self) -> Option<ScanResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<ScanResult> {
        self.result_receiver.recv().ok()
    }

    pub fn recv_result_timeout(&self, timeout: Duration) -> Option<ScanResult> {
        self.result_receiver.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Workers exit once every sender is gone or the shutdown flag is set
        drop(self.queue);
        drop(self.result_receiver);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All scan workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<ScanEvent>,
    result_sender: Sender<ScanResult>,
    shutdown: Arc<AtomicBool>,
    pipeline: ScanPipeline,
    progress_sender: Option<Arc<broadcast::Sender<ScanProgressEvent>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                debug!("Worker {} processing scan row {}", worker_id, event.row);

                let result = if let Some(ref sender) = progress_sender {
                    let progress = BroadcastProgress::new(
                        &event.id,
                        event.row,
                        event.serial.trim(),
                        Arc::clone(sender),
                    );
                    progress.report(ProgressEvent::Phase {
                        phase: ScanPhase::Queued,
                        message: "Scan queued for processing".to_string(),
                    });
                    pipeline.run(event, &progress)
                } else {
                    pipeline.run(event, &NoopProgress)
                };

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
