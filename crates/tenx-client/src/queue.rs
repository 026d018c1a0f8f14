//! Background job queue.
//!
//! Jobs run one at a time, in submission order, on a single worker task.
//! A job runs at most once. Failures are logged and never retried.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Error type returned by jobs.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

type JobFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

const QUEUE_CAPACITY: usize = 256;

enum Request {
    Job { name: &'static str, job: JobFuture },
    Flush(oneshot::Sender<()>),
}

/// FIFO queue of background jobs.
pub struct BackgroundQueue {
    tx: mpsc::Sender<Request>,
    worker_handle: JoinHandle<()>,
}

impl BackgroundQueue {
    /// Spawn the worker. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let worker_handle = tokio::spawn(worker(rx));
        Self { tx, worker_handle }
    }

    /// Enqueue a job without waiting for it. Returns `false` when the job was
    /// dropped because the queue is full or closed.
    pub fn submit<F>(&self, name: &'static str, job: F) -> bool
    where
        F: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        match self.tx.try_send(Request::Job {
            name,
            job: Box::pin(job),
        }) {
            Ok(()) => true,
            Err(e) => {
                warn!(job = name, error = %e, "background job dropped");
                false
            }
        }
    }

    /// Wait until every job submitted before this call has finished.
    pub async fn flush(&self) {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Request::Flush(reply_tx)).await.is_err() {
            if self.worker_handle.is_finished() {
                warn!("background worker exited");
            }
            return;
        }
        let _ = reply_rx.await;
    }

    /// Drain outstanding jobs and stop the worker.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            warn!(error = %e, "background worker panicked");
        }
    }
}

impl Default for BackgroundQueue {
    fn default() -> Self {
        Self::new()
    }
}

async fn worker(mut rx: mpsc::Receiver<Request>) {
    while let Some(req) = rx.recv().await {
        match req {
            Request::Flush(reply) => {
                let _ = reply.send(());
            }
            Request::Job { name, job } => match job.await {
                Ok(()) => debug!(job = name, "background job done"),
                Err(e) => warn!(job = name, error = %e, "background job failed"),
            },
        }
    }
}
