//! In-memory job store.
//!
//! Useful for testing.

use super::JobStore;
use crate::error::{LecternError, Result};
use crate::job::{Job, JobId, JobStatus};
use crate::lecture::Lecture;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    lectures: HashMap<JobId, Lecture>,
}

/// In-memory job store.
#[derive(Default)]
pub struct MemoryJobStore {
    tables: RwLock<Tables>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(e: std::sync::PoisonError<T>) -> LecternError {
    LecternError::Store(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn upsert_job(&self, job: &Job) -> Result<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.lectures.insert(job.id.clone(), Lecture::project(job));
        tables.jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.jobs.get(id).cloned())
    }

    async fn list_jobs(&self, statuses: &[JobStatus]) -> Result<Vec<Job>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| statuses.is_empty() || statuses.contains(&job.status))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn get_lecture(&self, id: &JobId) -> Result<Option<Lecture>> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(tables.lectures.get(id).cloned())
    }

    async fn list_lectures(&self) -> Result<Vec<Lecture>> {
        let tables = self.tables.read().map_err(poisoned)?;
        let mut lectures: Vec<Lecture> = tables.lectures.values().cloned().collect();
        lectures.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(lectures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Depth;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_lecture_follows_job() {
        let store = MemoryJobStore::new();
        let mut job = Job::new(PathBuf::from("/tmp/a.md"), Some("a.md".into()), "a".into(), Depth::High);
        store.upsert_job(&job).await.unwrap();

        job.apply(JobStatus::Extracting).unwrap();
        job.apply(JobStatus::Scripting).unwrap();
        job.title = Some("Alpha".into());
        store.upsert_job(&job).await.unwrap();

        let lecture = store.require_lecture(&job.id).await.unwrap();
        assert_eq!(lecture.title, "Alpha");
        assert_eq!(lecture.updated_at, job.updated_at);
        assert_eq!(store.list_jobs(&[JobStatus::Scripting]).await.unwrap().len(), 1);
        assert!(store.list_jobs(&[JobStatus::Done]).await.unwrap().is_empty());
    }
}
