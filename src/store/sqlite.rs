//! SQLite-based job store.
//!
//! Each job row keeps the queryable columns alongside the full record as JSON.

use super::JobStore;
use crate::error::{LecternError, Result};
use crate::job::{Job, JobId, JobStatus};
use crate::lecture::{Lecture, LectureStatus};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        record_json TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);

    CREATE TABLE IF NOT EXISTS lectures (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        source_filename TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        script_path TEXT,
        chunks_path TEXT,
        duration_sec INTEGER
    );
"#;

/// SQLite-based job store.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Readers (the HTTP API) run alongside the worker's writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized job store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LecternError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn job_from_json(json: &str) -> Result<Job> {
    serde_json::from_str(json)
        .map_err(|e| LecternError::Store(format!("Corrupt job record: {}", e)))
}

fn lecture_from_row(row: &Row<'_>) -> rusqlite::Result<Lecture> {
    let id: String = row.get(0)?;
    let status: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    let updated_at: String = row.get(5)?;
    let script_path: Option<String> = row.get(6)?;
    let chunks_path: Option<String> = row.get(7)?;

    Ok(Lecture {
        id: JobId::from(id),
        title: row.get(1)?,
        source_filename: row.get(2)?,
        status: status.parse::<LectureStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        script_path: script_path.map(Into::into),
        chunks_path: chunks_path.map(Into::into),
        duration_sec: row.get(8)?,
    })
}

const LECTURE_COLUMNS: &str = "id, title, source_filename, status, created_at, updated_at, \
                               script_path, chunks_path, duration_sec";

#[async_trait]
impl JobStore for SqliteJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id, status = %job.status))]
    async fn upsert_job(&self, job: &Job) -> Result<()> {
        let record = serde_json::to_string(job)?;
        let lecture = Lecture::project(job);

        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO jobs (id, status, created_at, updated_at, record_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                job.id.as_str(),
                job.status.as_str(),
                timestamp(&job.created_at),
                timestamp(&job.updated_at),
                record,
            ],
        )?;

        tx.execute(
            r#"
            INSERT OR REPLACE INTO lectures
            (id, title, source_filename, status, created_at, updated_at,
             script_path, chunks_path, duration_sec)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                lecture.id.as_str(),
                lecture.title,
                lecture.source_filename,
                lecture.status.as_str(),
                timestamp(&lecture.created_at),
                timestamp(&lecture.updated_at),
                lecture.script_path.map(|p| p.to_string_lossy().into_owned()),
                lecture.chunks_path.map(|p| p.to_string_lossy().into_owned()),
                lecture.duration_sec,
            ],
        )?;

        tx.commit()?;
        debug!("Upserted job");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_job(&self, id: &JobId) -> Result<Option<Job>> {
        let conn = self.lock()?;
        let record: Option<String> = conn
            .query_row(
                "SELECT record_json FROM jobs WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        record.as_deref().map(job_from_json).transpose()
    }

    #[instrument(skip(self))]
    async fn list_jobs(&self, statuses: &[JobStatus]) -> Result<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT status, record_json FROM jobs ORDER BY created_at, id")?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (status, record) = row?;
            if statuses.is_empty() || statuses.iter().any(|s| s.as_str() == status) {
                jobs.push(job_from_json(&record)?);
            }
        }
        Ok(jobs)
    }

    #[instrument(skip(self))]
    async fn get_lecture(&self, id: &JobId) -> Result<Option<Lecture>> {
        let conn = self.lock()?;
        let lecture = conn
            .query_row(
                &format!("SELECT {} FROM lectures WHERE id = ?1", LECTURE_COLUMNS),
                params![id.as_str()],
                lecture_from_row,
            )
            .optional()?;
        Ok(lecture)
    }

    #[instrument(skip(self))]
    async fn list_lectures(&self) -> Result<Vec<Lecture>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM lectures ORDER BY created_at DESC, id",
            LECTURE_COLUMNS
        ))?;
        let lectures = stmt
            .query_map([], lecture_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(lectures)
    }
}
