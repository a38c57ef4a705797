use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::{HashqError, Result};
use crate::protocol::Response;
use crate::scheduler::Scheduler;
use crate::transport::ReplyChannels;
use crate::worker::executor::JobExecutor;

/// Fixed set of OS threads draining the scheduler.
///
/// Workers are interchangeable. They never reorder jobs among themselves;
/// the scheduler decides what each one gets next.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        size: usize,
        scheduler: Arc<Scheduler>,
        executor: JobExecutor,
        replies: Arc<dyn ReplyChannels>,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(size);
        for worker in 0..size {
            let scheduler = scheduler.clone();
            let executor = executor.clone();
            let replies = replies.clone();
            let handle = std::thread::Builder::new()
                .name(format!("hashq-worker-{worker}"))
                .spawn(move || worker_loop(worker, &scheduler, &executor, replies.as_ref()))?;
            handles.push(handle);
        }
        tracing::info!(workers = size, "Worker pool started");
        Ok(Self { handles })
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit. Workers only exit once the scheduler
    /// is closed and empty.
    pub fn join(self) {
        for handle in self.handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
    }
}

fn worker_loop(
    worker: usize,
    scheduler: &Scheduler,
    executor: &JobExecutor,
    replies: &dyn ReplyChannels,
) {
    while let Some(job) = scheduler.dequeue_blocking() {
        tracing::debug!(
            worker,
            job_id = %job.id,
            path = %job.path().display(),
            declared_size = job.declared_size(),
            wait_ms = job.wait_ms(),
            "Job dequeued"
        );

        let result = executor.execute(&job);

        // A client that went away costs us this one reply, nothing more.
        match deliver(replies, job.reply_channel(), &result.response) {
            Ok(()) => tracing::info!(
                worker,
                job_id = %job.id,
                reply = %job.reply_channel().display(),
                outcome = %result.outcome,
                from_cache = result.response.from_cache,
                hash = %result.response.hash,
                "Response delivered"
            ),
            Err(e) => tracing::warn!(worker, job_id = %job.id, error = %e, "Delivery failed"),
        }
    }
    tracing::debug!(worker, "Worker exiting");
}

/// Write one fixed-size response record to a client's reply channel.
pub fn deliver(replies: &dyn ReplyChannels, channel: &Path, response: &Response) -> Result<()> {
    let delivery_error = |source| HashqError::Delivery {
        path: channel.to_path_buf(),
        source,
    };
    let mut writer = replies.open(channel).map_err(delivery_error)?;
    writer.write_all(&response.encode()).map_err(delivery_error)?;
    writer.flush().map_err(delivery_error)?;
    Ok(())
}
