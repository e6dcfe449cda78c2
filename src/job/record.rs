//! The persisted job record.

use super::JobStatus;
use crate::error::{LecternError, Result};
use crate::script::Depth;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Message shown to clients for any failed job.
pub const FAILURE_SUMMARY: &str = "Processing failed. Please try again or check logs.";

/// Opaque job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One submitted document moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Stored copy of the uploaded document.
    pub source_path: PathBuf,
    /// Original file name as uploaded.
    pub source_filename: Option<String>,
    /// Title passed to the script writer.
    pub title_hint: String,
    pub depth: Depth,
    pub extraction_output: Option<PathBuf>,
    pub script_output: Option<PathBuf>,
    pub chunks_output: Option<PathBuf>,
    /// Single audio file, or an `.m3u` playlist of segments.
    pub audio_output: Option<PathBuf>,
    /// Title of the generated script.
    pub title: Option<String>,
    pub duration_sec: Option<u32>,
    pub error_summary: Option<String>,
    pub error_detail: Option<String>,
}

impl Job {
    /// Create a new queued job.
    pub fn new(source_path: PathBuf, source_filename: Option<String>, title_hint: String, depth: Depth) -> Self {
        Self::with_id(JobId::new(), source_path, source_filename, title_hint, depth)
    }

    pub fn with_id(
        id: JobId,
        source_path: PathBuf,
        source_filename: Option<String>,
        title_hint: String,
        depth: Depth,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            source_path,
            source_filename,
            title_hint,
            depth,
            extraction_output: None,
            script_output: None,
            chunks_output: None,
            audio_output: None,
            title: None,
            duration_sec: None,
            error_summary: None,
            error_detail: None,
        }
    }

    /// Move to `next`, refreshing `updated_at`.
    ///
    /// The status is left untouched when the transition is not allowed.
    pub fn apply(&mut self, next: JobStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LecternError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        // Never step backwards even if the clock does.
        let now = Utc::now().max(self.updated_at);
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Transition to `failed` and record both error messages.
    pub fn fail(&mut self, detail: impl Into<String>) -> Result<()> {
        self.apply(JobStatus::Failed)?;
        self.error_summary = Some(FAILURE_SUMMARY.to_string());
        self.error_detail = Some(detail.into());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a readable script artifact has been recorded.
    pub fn script_ready(&self) -> bool {
        self.script_output.as_ref().is_some_and(|p| p.exists())
    }

    /// Whether chunks have been recorded and still exist on disk.
    pub fn chunks_ready(&self) -> bool {
        self.chunks_output.as_ref().is_some_and(|p| p.exists())
    }

    pub fn audio_ready(&self) -> bool {
        self.audio_output.as_ref().is_some_and(|p| p.exists())
    }
}
