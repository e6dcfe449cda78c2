//! Read access to finished and in-progress lectures.
//!
//! Everything here reads the job store and artifact files; the only write is
//! re-chunking a terminal job, which the worker never touches again.

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::chunking::{chunk_at, context, segment, LectureChunk};
use crate::config::{ChunkingSettings, Settings};
use crate::error::{LecternError, Result};
use crate::job::{JobId, JobStatus};
use crate::lecture::{playback_instructions, JobView, Lecture};
use crate::script::LectureScript;
use crate::speech::AudioArtifact;
use crate::store::JobStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Narration preceding a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkContext {
    pub text: String,
    pub duration_sec: u32,
}

/// What a live narrator needs before the first chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackGuide {
    pub title: String,
    pub outline: Vec<String>,
    pub instructions: String,
}

/// Result of re-chunking one lecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechunkResult {
    pub id: JobId,
    pub title: String,
    pub chunks: usize,
}

/// Query surface over the job store and artifacts.
#[derive(Clone)]
pub struct Library {
    store: Arc<dyn JobStore>,
    artifacts: ArtifactStore,
    chunking: ChunkingSettings,
}

impl Library {
    pub fn new(settings: &Settings, store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            artifacts: ArtifactStore::new(settings.data_dir()),
            chunking: settings.chunking.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Client-facing job status. Never carries the diagnostic detail.
    pub async fn job_view(&self, id: &JobId) -> Result<JobView> {
        let job = self.store.require_job(id).await?;
        Ok(JobView::from(&job))
    }

    pub async fn lectures(&self) -> Result<Vec<Lecture>> {
        self.store.list_lectures().await
    }

    pub async fn lecture(&self, id: &JobId) -> Result<Lecture> {
        self.store.require_lecture(id).await
    }

    pub async fn script(&self, id: &JobId) -> Result<LectureScript> {
        let lecture = self.lecture(id).await?;
        let path = lecture
            .script_path
            .ok_or_else(|| LecternError::NotFound(format!("Script for {}", id)))?;
        self.artifacts.read_json(&path)
    }

    /// The job's synthesized audio, as a single file or a playlist.
    pub async fn audio(&self, id: &JobId) -> Result<AudioArtifact> {
        let job = self.store.require_job(id).await?;
        let path = job
            .audio_output
            .ok_or_else(|| LecternError::NotFound(format!("Audio for {}", id)))?;
        AudioArtifact::open(&path).await
    }

    pub async fn chunks(&self, id: &JobId) -> Result<Vec<LectureChunk>> {
        let lecture = self.lecture(id).await?;
        let path = lecture
            .chunks_path
            .ok_or_else(|| LecternError::NotFound(format!("Chunks for {}", id)))?;
        self.artifacts.read_json(&path)
    }

    pub async fn chunk(&self, id: &JobId, index: usize) -> Result<LectureChunk> {
        let chunks = self.chunks(id).await?;
        chunk_at(&chunks, index).cloned()
    }

    /// Narration leading up to chunk `index`, `window` seconds back at most
    /// (the configured default when `None`).
    pub async fn context(&self, id: &JobId, index: usize, window: Option<u32>) -> Result<ChunkContext> {
        if window == Some(0) {
            return Err(LecternError::InvalidInput(
                "Context window must be at least 1 second".to_string(),
            ));
        }
        let chunks = self.chunks(id).await?;
        chunk_at(&chunks, index)?;
        let window = window.unwrap_or(self.chunking.context_window_seconds);
        let (text, duration_sec) = context(&chunks, index, window);
        Ok(ChunkContext { text, duration_sec })
    }

    pub async fn playback_guide(&self, id: &JobId) -> Result<PlaybackGuide> {
        let script = self.script(id).await?;
        let outline = script.outline();
        Ok(PlaybackGuide {
            instructions: playback_instructions(Some(&script.title), &outline),
            title: script.title,
            outline,
        })
    }

    /// Regenerate the chunk artifact from the stored script.
    ///
    /// Only finished jobs can be re-chunked.
    #[instrument(skip(self))]
    pub async fn rechunk(&self, id: &JobId) -> Result<RechunkResult> {
        let mut job = self.store.require_job(id).await?;
        if !job.is_terminal() {
            return Err(LecternError::InvalidInput(format!(
                "Job {} is still {}; wait for it to finish",
                id, job.status
            )));
        }
        let script_path = job
            .script_output
            .clone()
            .ok_or_else(|| LecternError::NotFound(format!("Script for {}", id)))?;
        let script: LectureScript = self.artifacts.read_json(&script_path)?;

        let chunks = segment(
            &script,
            self.chunking.target_seconds,
            self.chunking.words_per_second,
        );
        let path = self.artifacts.write_json(ArtifactKind::Chunks, id, &chunks)?;

        if job.chunks_output.is_none() {
            job.chunks_output = Some(path);
            self.store.upsert_job(&job).await?;
        }

        info!("Re-chunked {} into {} chunks", id, chunks.len());
        Ok(RechunkResult {
            id: id.clone(),
            title: script.title,
            chunks: chunks.len(),
        })
    }

    /// Terminal jobs with a script, oldest first.
    pub async fn rechunkable(&self) -> Result<Vec<JobId>> {
        let jobs = self
            .store
            .list_jobs(&[JobStatus::Done, JobStatus::Failed])
            .await?;
        Ok(jobs
            .into_iter()
            .filter(|job| job.script_ready())
            .map(|job| job.id)
            .collect())
    }
}
