//! The sequential job worker.

use super::queue::{Dequeue, QueueReceiver};
use super::stages::{Stage, StageError, StageErrorKind, StageExecutors, StageResult};
use super::Collaborators;
use crate::config::Settings;
use crate::error::Result;
use crate::job::{Job, JobId, JobStatus};
use crate::store::JobStore;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Processes one job at a time, start to finish.
///
/// Progress is driven by the job's persisted status, so a job picked up
/// after a restart continues from its last completed stage.
pub struct Worker {
    store: Arc<dyn JobStore>,
    stages: StageExecutors,
    poll_interval: Duration,
    poll_store: bool,
}

impl Worker {
    pub fn new(settings: &Settings, store: Arc<dyn JobStore>, collaborators: Collaborators) -> Self {
        Self {
            store,
            stages: StageExecutors::new(settings, collaborators),
            poll_interval: settings.worker.poll_interval(),
            poll_store: false,
        }
    }

    /// Also look for `queued` jobs in the store whenever the queue is idle.
    ///
    /// Needed when jobs are submitted by another process, which can only
    /// write the store.
    pub fn polling_store(mut self) -> Self {
        self.poll_store = true;
        self
    }

    /// Drain the queue until it closes or `shutdown` fires.
    ///
    /// A stop request is honored between stages; the interrupted job keeps
    /// its last persisted status and is picked up again by recovery.
    pub async fn run(&self, mut receiver: QueueReceiver, shutdown: CancellationToken) {
        info!("Worker started");
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = receiver.next(self.poll_interval) => next,
            };

            match next {
                Dequeue::Job(id) => {
                    if let Err(e) = self.process_job(&id, &shutdown).await {
                        error!("Job {} could not be processed: {}", id, e);
                    }
                }
                Dequeue::Empty if self.poll_store => {
                    if let Err(e) = self.process_stored_queued(&shutdown).await {
                        error!("Polling for queued jobs failed: {}", e);
                    }
                }
                Dequeue::Empty => continue,
                Dequeue::Closed => {
                    debug!("Submission queue closed");
                    break;
                }
            }
        }
        info!("Worker stopped");
    }

    /// Process every job the store holds as `queued`, oldest first.
    async fn process_stored_queued(&self, shutdown: &CancellationToken) -> Result<()> {
        for job in self.store.list_jobs(&[JobStatus::Queued]).await? {
            if shutdown.is_cancelled() {
                break;
            }
            debug!("Picked up {} from the store", job.id);
            self.process_job(&job.id, shutdown).await?;
        }
        Ok(())
    }

    /// Run a job until it is terminal or a stop is requested.
    ///
    /// Returns the job's last persisted status, or `None` for an unknown id.
    /// Stage failures are recorded on the job; only store errors surface here.
    #[instrument(skip(self, shutdown))]
    pub async fn process_job(&self, id: &JobId, shutdown: &CancellationToken) -> Result<Option<JobStatus>> {
        let Some(mut job) = self.store.get_job(id).await? else {
            warn!("Discarding unknown job");
            return Ok(None);
        };
        if job.is_terminal() {
            debug!("Job already {}; nothing to do", job.status);
            return Ok(Some(job.status));
        }

        while !job.is_terminal() {
            if shutdown.is_cancelled() {
                info!("Stop requested; job stays {}", job.status);
                break;
            }

            match self.advance(&mut job).await {
                Ok(()) => self.store.upsert_job(&job).await?,
                Err(e) => {
                    error!("{}", e);
                    job.fail(e.to_string())?;
                    self.store.upsert_job(&job).await?;
                }
            }
        }

        if job.status == JobStatus::Done {
            info!("Job done: {}", job.title.as_deref().unwrap_or(&job.title_hint));
        }
        Ok(Some(job.status))
    }

    /// Run the stage belonging to the job's current status and move it on.
    async fn advance(&self, job: &mut Job) -> StageResult<()> {
        match job.status {
            JobStatus::Queued => transition(job, JobStatus::Extracting, Stage::Extract),
            JobStatus::Extracting => {
                let (_, path) = self.stages.extract(job).await?;
                job.extraction_output = Some(path);
                transition(job, JobStatus::Scripting, Stage::Extract)
            }
            JobStatus::Scripting => self.script_and_chunk(job).await,
            JobStatus::SynthesizingAudio => {
                let script_path = require(job.script_output.clone(), Stage::SynthesizeAudio, "script")?;
                let script = self.stages.load_script(&script_path, Stage::SynthesizeAudio)?;
                let audio = self.stages.synthesize_audio(job, &script).await?;
                job.audio_output = Some(audio.path().to_path_buf());
                transition(job, JobStatus::Delivering, Stage::SynthesizeAudio)
            }
            JobStatus::Delivering => {
                let audio = require(job.audio_output.clone(), Stage::Deliver, "audio")?;
                self.stages.deliver(job, &audio).await?;
                transition(job, JobStatus::Done, Stage::Deliver)
            }
            JobStatus::Done | JobStatus::Failed => Ok(()),
        }
    }

    /// The script stage, with its output persisted before chunking starts.
    async fn script_and_chunk(&self, job: &mut Job) -> StageResult<()> {
        let extractions = match job.extraction_output.clone() {
            Some(path) => match self.stages.load_extractions(&path) {
                Ok(extractions) => extractions,
                Err(e) if e.kind == StageErrorKind::NotFound => {
                    warn!("Extraction artifact missing; analyzing again");
                    self.reextract(job).await?
                }
                Err(e) => return Err(e),
            },
            None => self.reextract(job).await?,
        };

        let output = self.stages.script(job, &extractions).await?;
        job.script_output = Some(output.path);
        job.title = Some(output.script.title.clone());
        job.duration_sec = Some(output.script.duration_estimate_sec);
        self.store
            .upsert_job(job)
            .await
            .map_err(|e| StageError::from_error(Stage::Script, e))?;

        let (_, chunks_path) = self.stages.chunk(job, &output.script)?;
        job.chunks_output = Some(chunks_path);

        let next = if self.stages.audio_enabled() {
            JobStatus::SynthesizingAudio
        } else {
            JobStatus::Done
        };
        transition(job, next, Stage::Chunk)
    }

    async fn reextract(&self, job: &mut Job) -> StageResult<Vec<crate::extraction::Extraction>> {
        let (extractions, path) = self.stages.extract(job).await?;
        job.extraction_output = Some(path);
        Ok(extractions)
    }
}

fn transition(job: &mut Job, next: JobStatus, stage: Stage) -> StageResult<()> {
    job.apply(next).map_err(|e| StageError::from_error(stage, e))
}

fn require<T>(value: Option<T>, stage: Stage, what: &str) -> StageResult<T> {
    value.ok_or_else(|| {
        StageError::new(stage, StageErrorKind::NotFound, format!("job has no {} output", what))
    })
}
