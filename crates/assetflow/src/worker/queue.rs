//! Single-threaded job runner for a task-queue consumer.
//!
//! Jobs are executed strictly one at a time on one background thread, so a
//! `source_id` directory is never touched by two runs of the same worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, info};

use crate::error::WorkerError;
use crate::pipeline::{Pipeline, PipelineContext, ProgressReporter, TracingProgress};
use crate::worker::job::{Job, JobResult};

const QUEUE_CAPACITY: usize = 16;

pub struct Worker {
    job_sender: Sender<Job>,
    result_receiver: Receiver<JobResult>,
    handle: JoinHandle<()>,
    shutdown: Arc<AtomicBool>,
}

impl Worker {
    pub fn start(pipeline: Pipeline) -> Result<Self, WorkerError> {
        Self::with_progress(pipeline, Box::new(TracingProgress))
    }

    pub fn with_progress(
        pipeline: Pipeline,
        progress: Box<dyn ProgressReporter>,
    ) -> Result<Self, WorkerError> {
        let (job_sender, job_receiver) = bounded::<Job>(QUEUE_CAPACITY);
        let (result_sender, result_receiver) = bounded::<JobResult>(QUEUE_CAPACITY);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name("assetflow-worker".to_string())
            .spawn(move || {
                run_worker(pipeline, progress, job_receiver, result_sender, shutdown_flag);
            })
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        info!("Started worker");

        Ok(Self {
            job_sender,
            result_receiver,
            handle,
            shutdown,
        })
    }

    pub fn submit(&self, job: Job) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.job_sender
            .send(job)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    pub fn try_recv_result(&self) -> Option<JobResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<JobResult> {
        self.result_receiver.recv().ok()
    }

    /// Stops accepting jobs. The job in progress, if any, still completes.
    pub fn shutdown(&self) {
        info!("Shutting down worker...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn wait(self) {
        // Drop sender to signal the worker to exit once the queue is drained
        drop(self.job_sender);

        if let Err(e) = self.handle.join() {
            error!("Worker panicked: {:?}", e);
        } else {
            debug!("Worker finished");
        }

        info!("Worker has stopped");
    }
}

fn run_worker(
    pipeline: Pipeline,
    progress: Box<dyn ProgressReporter>,
    job_receiver: Receiver<Job>,
    result_sender: Sender<JobResult>,
    shutdown: Arc<AtomicBool>,
) {
    debug!("Worker started");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker received shutdown signal");
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker processing job {}", job.id);

                let ctx = PipelineContext::new(job.clone());
                let (pipeline_result, _ctx) = pipeline.run(ctx, progress.as_ref());
                let result = JobResult::from_pipeline(&job, &pipeline_result);

                if let Err(e) = result_sender.send(result) {
                    error!("Worker failed to send result: {}", e);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => {
                debug!("Worker job channel disconnected");
                break;
            }
        }
    }

    debug!("Worker stopped");
}
