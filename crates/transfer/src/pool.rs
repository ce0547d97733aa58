//! Fixed set of workers pulling jobs from a bounded queue.
//!
//! A pool is built once and shared by any number of upload tasks; each
//! task submits one job per pending block.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::UploadError;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Bounded worker pool. Must be created inside a tokio runtime.
///
/// Dropping the pool closes its queue; workers finish the jobs already
/// queued and exit.
pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` workers sharing a queue of `queue_capacity` jobs.
    /// Both are raised to at least 1.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>(queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..workers.max(1))
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                tokio::spawn(worker_loop(id, receiver))
            })
            .collect();

        Self { sender, workers }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queues `job`, waiting while the queue is full.
    pub async fn submit<F>(&self, job: F) -> Result<(), UploadError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.sender
            .send(Box::pin(job))
            .await
            .map_err(|_| UploadError::PoolClosed)
    }

    /// Closes the queue and waits for every worker to drain it.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            if let Err(e) = handle.await {
                error!(error = %e, "worker terminated abnormally");
            }
        }
    }
}

async fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        // Hold the lock only while waiting for the next job.
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            debug!(worker = id, "queue closed, worker exiting");
            return;
        };
        if AssertUnwindSafe(job).catch_unwind().await.is_err() {
            error!(worker = id, "job panicked");
        }
    }
}
