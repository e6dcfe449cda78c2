//! In-process submission queue.
//!
//! The queue only carries job ids; the job table is the source of truth. An
//! id for a job that is already terminal (or gone) is discarded by the
//! worker, which makes duplicate enqueues harmless.

use crate::error::{LecternError, Result};
use crate::job::{JobId, JobStatus};
use crate::store::JobStore;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, instrument};

/// Create a connected queue handle and receiver.
pub fn channel() -> (SubmissionQueue, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SubmissionQueue { tx }, QueueReceiver { rx })
}

/// Cloneable handle for adding job ids to the queue.
#[derive(Clone)]
pub struct SubmissionQueue {
    tx: mpsc::UnboundedSender<JobId>,
}

impl SubmissionQueue {
    pub fn enqueue(&self, id: JobId) -> Result<()> {
        self.tx
            .send(id)
            .map_err(|e| LecternError::Store(format!("Submission queue closed; dropped job {}", e.0)))
    }
}

/// Result of one bounded wait on the queue.
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue {
    Job(JobId),
    /// Nothing arrived within the wait.
    Empty,
    /// Every handle is gone and the queue is drained.
    Closed,
}

/// The worker's end of the queue.
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<JobId>,
}

impl QueueReceiver {
    /// Wait at most `wait` for the next id.
    pub async fn next(&mut self, wait: Duration) -> Dequeue {
        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(Some(id)) => Dequeue::Job(id),
            Ok(None) => Dequeue::Closed,
            Err(_) => Dequeue::Empty,
        }
    }
}

/// Re-enqueue every job left in a non-terminal status, oldest first.
///
/// Run once at startup, before the worker starts dequeuing.
#[instrument(skip_all)]
pub async fn recover(store: &dyn JobStore, queue: &SubmissionQueue) -> Result<usize> {
    let pending = store.list_jobs(&JobStatus::ACTIVE).await?;
    for job in &pending {
        info!("Recovering job {} ({})", job.id, job.status);
        queue.enqueue(job.id.clone())?;
    }
    if !pending.is_empty() {
        info!("Re-enqueued {} unfinished jobs", pending.len());
    }
    Ok(pending.len())
}
