//! Read-side views of jobs.
//!
//! A `Lecture` is what listeners browse: it is recomputed from its job on
//! every write and never drives the pipeline. `JobView` is the job as shown
//! to clients, without operator diagnostics.

use crate::job::{Job, JobId, JobStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Listener-facing lecture status.
///
/// Audio synthesis and delivery happen after chunks exist, so a lecture is
/// already playable (`done`) while those stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LectureStatus {
    Queued,
    Extracting,
    Scripting,
    Done,
    Failed,
}

impl LectureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LectureStatus::Queued => "queued",
            LectureStatus::Extracting => "extracting",
            LectureStatus::Scripting => "scripting",
            LectureStatus::Done => "done",
            LectureStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LectureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LectureStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "queued" => Ok(LectureStatus::Queued),
            "extracting" => Ok(LectureStatus::Extracting),
            "scripting" => Ok(LectureStatus::Scripting),
            "done" => Ok(LectureStatus::Done),
            "failed" => Ok(LectureStatus::Failed),
            _ => Err(format!("Unknown lecture status: {}", s)),
        }
    }
}

impl From<JobStatus> for LectureStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => LectureStatus::Queued,
            JobStatus::Extracting => LectureStatus::Extracting,
            JobStatus::Scripting => LectureStatus::Scripting,
            JobStatus::SynthesizingAudio | JobStatus::Delivering | JobStatus::Done => {
                LectureStatus::Done
            }
            JobStatus::Failed => LectureStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lecture {
    pub id: JobId,
    pub title: String,
    pub source_filename: Option<String>,
    pub status: LectureStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub script_path: Option<PathBuf>,
    pub chunks_path: Option<PathBuf>,
    pub duration_sec: Option<u32>,
}

impl Lecture {
    /// Derive the lecture for `job`.
    pub fn project(job: &Job) -> Self {
        let title = job
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| {
                job.source_filename
                    .as_deref()
                    .and_then(|name| Path::new(name).file_stem())
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| job.id.to_string());

        Self {
            id: job.id.clone(),
            title,
            source_filename: job.source_filename.clone(),
            status: job.status.into(),
            created_at: job.created_at,
            updated_at: job.updated_at,
            script_path: job.script_output.clone(),
            chunks_path: job.chunks_output.clone(),
            duration_sec: job.duration_sec,
        }
    }

    pub fn script_ready(&self) -> bool {
        self.script_path.as_ref().is_some_and(|p| p.exists())
    }

    pub fn chunks_ready(&self) -> bool {
        self.chunks_path.as_ref().is_some_and(|p| p.exists())
    }

    /// Done and with chunks on disk.
    pub fn is_playable(&self) -> bool {
        self.status == LectureStatus::Done && self.chunks_ready()
    }
}

/// A job as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub source_filename: Option<String>,
    pub script_ready: bool,
    pub audio_ready: bool,
    pub error_summary: Option<String>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
            source_filename: job.source_filename.clone(),
            script_ready: job.script_ready(),
            audio_ready: job.audio_ready(),
            error_summary: job.error_summary.clone(),
        }
    }
}

/// Guidance for a live narrator reading the lecture chunk by chunk.
pub fn playback_instructions(title: Option<&str>, outline: &[String]) -> String {
    let mut parts = Vec::new();
    if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
        parts.push(format!("Lecture title: {}.", title));
    }
    parts.extend(
        [
            "You are a lecturer delivering a clear, engaging lecture.",
            "Speak naturally and at a steady pace, using vivid language and concrete examples.",
            "You will receive lecture chunks from the client; read them aloud verbatim as narration.",
            "If the user interrupts with STOP and a question, answer using the provided recent context and lecture outline.",
            "If the user says 'forge ahead', continue from the next chunk.",
        ]
        .map(str::to_string),
    );
    if !outline.is_empty() {
        parts.push(format!("Lecture outline: {}.", outline.join(", ")));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Depth;

    fn job() -> Job {
        Job::with_id(
            JobId::from("j1"),
            PathBuf::from("/uploads/j1.pdf"),
            Some("Linear Algebra.pdf".to_string()),
            "Linear Algebra".to_string(),
            Depth::Medium,
        )
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(LectureStatus::from(JobStatus::Queued), LectureStatus::Queued);
        assert_eq!(LectureStatus::from(JobStatus::Scripting), LectureStatus::Scripting);
        assert_eq!(LectureStatus::from(JobStatus::SynthesizingAudio), LectureStatus::Done);
        assert_eq!(LectureStatus::from(JobStatus::Delivering), LectureStatus::Done);
        assert_eq!(LectureStatus::from(JobStatus::Failed), LectureStatus::Failed);
    }

    #[test]
    fn test_project_title_falls_back_to_filename_then_id() {
        let mut job = job();
        assert_eq!(Lecture::project(&job).title, "Linear Algebra");

        job.title = Some("Vectors and Matrices".to_string());
        assert_eq!(Lecture::project(&job).title, "Vectors and Matrices");

        job.title = None;
        job.source_filename = None;
        assert_eq!(Lecture::project(&job).title, "j1");
    }

    #[test]
    fn test_project_tracks_job() {
        let mut job = job();
        job.apply(JobStatus::Extracting).unwrap();
        job.chunks_output = Some(PathBuf::from("/nowhere/j1.json"));
        let lecture = Lecture::project(&job);
        assert_eq!(lecture.status, LectureStatus::Extracting);
        assert_eq!(lecture.updated_at, job.updated_at);
        assert!(!lecture.chunks_ready());
        assert!(!lecture.is_playable());
    }

    #[test]
    fn test_job_view_hides_detail() {
        let mut job = job();
        job.fail("stage extract failed: connection reset").unwrap();
        let view = JobView::from(&job);
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("connection reset"));
        assert_eq!(view.error_summary.as_deref(), Some(crate::job::FAILURE_SUMMARY));
    }

    #[test]
    fn test_playback_instructions() {
        let text = playback_instructions(Some("Optics"), &["Lenses".to_string(), "Mirrors".to_string()]);
        assert!(text.starts_with("Lecture title: Optics."));
        assert!(text.ends_with("Lecture outline: Lenses, Mirrors."));

        let bare = playback_instructions(None, &[]);
        assert!(bare.starts_with("You are a lecturer"));
        assert!(!bare.contains("outline:"));
    }
}
