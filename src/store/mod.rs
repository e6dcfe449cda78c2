//! Durable job storage.
//!
//! Provides a trait-based interface over the job table and its lecture
//! projection, with SQLite and in-memory backends.

mod memory;
mod sqlite;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

use crate::error::{LecternError, Result};
use crate::job::{Job, JobId, JobStatus};
use crate::lecture::Lecture;
use async_trait::async_trait;

/// Persistent job and lecture records.
///
/// Writing a job also rewrites its lecture in the same atomic step, so the
/// two never disagree for a reader.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace a job and its lecture.
    async fn upsert_job(&self, job: &Job) -> Result<()>;

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>>;

    /// Jobs whose status is in `statuses` (all jobs when empty), oldest first.
    async fn list_jobs(&self, statuses: &[JobStatus]) -> Result<Vec<Job>>;

    async fn get_lecture(&self, id: &JobId) -> Result<Option<Lecture>>;

    /// All lectures, newest first.
    async fn list_lectures(&self) -> Result<Vec<Lecture>>;

    /// Like `get_job`, but a missing job is an error.
    async fn require_job(&self, id: &JobId) -> Result<Job> {
        self.get_job(id)
            .await?
            .ok_or_else(|| LecternError::NotFound(format!("Job {}", id)))
    }

    /// Like `get_lecture`, but a missing lecture is an error.
    async fn require_lecture(&self, id: &JobId) -> Result<Lecture> {
        self.get_lecture(id)
            .await?
            .ok_or_else(|| LecternError::NotFound(format!("Lecture {}", id)))
    }
}
