//! Stage executors.
//!
//! Each executor does one unit of pipeline work for a job: it calls its
//! collaborator, writes its artifact and hands the result back. Executors
//! never retry and never change the job's status; the worker decides what a
//! result means for the job.

use super::Collaborators;
use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::chunking::{segment, LectureChunk};
use crate::config::{AudioSettings, ChunkingSettings, Settings};
use crate::error::LecternError;
use crate::extraction::{Extraction, SourceDocument};
use crate::job::Job;
use crate::reply::ModelReply;
use crate::script::{parse_script, LectureScript};
use crate::speech::{assemble, split_text, AudioArtifact};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extract,
    Script,
    Chunk,
    SynthesizeAudio,
    Deliver,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Script => "script",
            Stage::Chunk => "chunk",
            Stage::SynthesizeAudio => "synthesize_audio",
            Stage::Deliver => "deliver",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong in a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageErrorKind {
    /// A collaborator reply could not be decoded, even after repair.
    Validation,
    /// A collaborator call failed.
    Collaborator,
    /// An artifact could not be read or written.
    Artifact,
    /// A job input or earlier output is missing.
    NotFound,
    /// The job asks for something this process cannot do.
    Unsupported,
    /// An illegal status change was attempted.
    Transition,
}

impl StageErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageErrorKind::Validation => "validation",
            StageErrorKind::Collaborator => "collaborator",
            StageErrorKind::Artifact => "artifact",
            StageErrorKind::NotFound => "not_found",
            StageErrorKind::Unsupported => "unsupported",
            StageErrorKind::Transition => "transition",
        }
    }
}

/// A tagged stage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageError {
    pub stage: Stage,
    pub kind: StageErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(stage: Stage, kind: StageErrorKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    /// Classify a library error raised inside `stage`.
    pub fn from_error(stage: Stage, err: LecternError) -> Self {
        let kind = match &err {
            e if e.is_not_found() => StageErrorKind::NotFound,
            LecternError::Validation(_) => StageErrorKind::Validation,
            LecternError::InvalidTransition { .. } => StageErrorKind::Transition,
            LecternError::InvalidInput(_) | LecternError::Config(_) => StageErrorKind::Unsupported,
            LecternError::Io(_)
            | LecternError::Json(_)
            | LecternError::Store(_)
            | LecternError::Database(_)
            | LecternError::TomlParse(_) => StageErrorKind::Artifact,
            _ => StageErrorKind::Collaborator,
        };
        Self::new(stage, kind, err.to_string())
    }
}

impl std::fmt::Display for StageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage {} failed ({}): {}", self.stage, self.kind.as_str(), self.message)
    }
}

impl std::error::Error for StageError {}

pub type StageResult<T> = std::result::Result<T, StageError>;

trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> StageResult<T>;
}

impl<T> StageContext<T> for crate::error::Result<T> {
    fn in_stage(self, stage: Stage) -> StageResult<T> {
        self.map_err(|e| StageError::from_error(stage, e))
    }
}

/// Output of the script stage.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub script: LectureScript,
    pub path: PathBuf,
    /// The script was built from extraction summaries instead of the model.
    pub used_fallback: bool,
}

/// Runs the individual stages for the worker.
pub struct StageExecutors {
    artifacts: ArtifactStore,
    collaborators: Collaborators,
    max_pages_per_window: usize,
    chunking: ChunkingSettings,
    audio: AudioSettings,
    sync_dir: Option<PathBuf>,
}

impl StageExecutors {
    pub fn new(settings: &Settings, collaborators: Collaborators) -> Self {
        Self {
            artifacts: ArtifactStore::new(settings.data_dir()),
            collaborators,
            max_pages_per_window: settings.extraction.max_pages_per_window,
            chunking: settings.chunking.clone(),
            audio: settings.audio.clone(),
            sync_dir: settings.sync_dir(),
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.enabled
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Analyze the source document window by window.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn extract(&self, job: &Job) -> StageResult<(Vec<Extraction>, PathBuf)> {
        let stage = Stage::Extract;
        let path = job.source_path.clone();
        let document = tokio::task::spawn_blocking(move || SourceDocument::load(&path))
            .await
            .map_err(|e| StageError::new(stage, StageErrorKind::Artifact, e.to_string()))?
            .in_stage(stage)?;

        let windows = document.windows(self.max_pages_per_window);
        if windows.is_empty() {
            return Err(StageError::new(stage, StageErrorKind::Validation, "document has no pages"));
        }
        info!("Analyzing {} pages in {} windows", document.page_count(), windows.len());

        let analyzer = &self.collaborators.analyzer;
        let mut extractions = Vec::with_capacity(windows.len());
        for pages in windows {
            let raw = analyzer.analyze(&document, pages).await.in_stage(stage)?;

            let mut extraction = match ModelReply::<Extraction>::parse(&raw) {
                ModelReply::Valid(extraction) => extraction,
                ModelReply::NeedsRepair { raw, reason } => {
                    warn!("Analysis of pages {} needs repair: {}", pages, reason);
                    let repaired = analyzer.repair(&raw).await.in_stage(stage)?;
                    match ModelReply::<Extraction>::parse(&repaired).into_result() {
                        Ok(extraction) => extraction,
                        Err(e) => {
                            warn!("Analysis of pages {} still invalid after repair", pages);
                            return Err(StageError::from_error(stage, e));
                        }
                    }
                }
            };
            extraction.pages = Some(pages);
            debug!("Pages {} analyzed", pages);
            extractions.push(extraction);
        }

        let path = self
            .artifacts
            .write_json(ArtifactKind::Extraction, &job.id, &extractions)
            .in_stage(stage)?;
        Ok((extractions, path))
    }

    /// Read back a previous extract stage's artifact.
    pub fn load_extractions(&self, path: &Path) -> StageResult<Vec<Extraction>> {
        self.artifacts.read_json(path).in_stage(Stage::Script)
    }

    /// Write the lecture script, falling back to a summary script when the
    /// model's reply is unusable.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn script(&self, job: &Job, extractions: &[Extraction]) -> StageResult<ScriptOutput> {
        let stage = Stage::Script;
        let reply = self
            .collaborators
            .writer
            .write_script(extractions, &job.title_hint, job.depth)
            .await;

        let (script, used_fallback) = match reply {
            Ok(raw) => match parse_script(&raw) {
                ModelReply::Valid(script) => (script, false),
                ModelReply::NeedsRepair { reason, .. } => {
                    warn!("Script reply unusable, using fallback: {}", reason);
                    (LectureScript::fallback(extractions, &job.title_hint), true)
                }
            },
            Err(e) => {
                warn!("Script generation failed, using fallback: {}", e);
                (LectureScript::fallback(extractions, &job.title_hint), true)
            }
        };

        let path = self
            .artifacts
            .write_json(ArtifactKind::Script, &job.id, &script)
            .in_stage(stage)?;
        info!("Script '{}' has {} chapters", script.title, script.chapters.len());
        Ok(ScriptOutput {
            script,
            path,
            used_fallback,
        })
    }

    pub fn load_script(&self, path: &Path, stage: Stage) -> StageResult<LectureScript> {
        self.artifacts.read_json(path).in_stage(stage)
    }

    /// Segment the script and write the full chunk list.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub fn chunk(&self, job: &Job, script: &LectureScript) -> StageResult<(Vec<LectureChunk>, PathBuf)> {
        let chunks = segment(
            script,
            self.chunking.target_seconds,
            self.chunking.words_per_second,
        );
        let path = self
            .artifacts
            .write_json(ArtifactKind::Chunks, &job.id, &chunks)
            .in_stage(Stage::Chunk)?;
        info!("Wrote {} chunks", chunks.len());
        Ok((chunks, path))
    }

    /// Voice the script and join the parts into one artifact.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn synthesize_audio(&self, job: &Job, script: &LectureScript) -> StageResult<AudioArtifact> {
        let stage = Stage::SynthesizeAudio;
        let speech = self.collaborators.speech.as_ref().ok_or_else(|| {
            StageError::new(stage, StageErrorKind::Unsupported, "no speech synthesizer configured")
        })?;

        let segments = split_text(&script.to_narration(), self.audio.max_segment_chars);
        if segments.is_empty() {
            return Err(StageError::new(stage, StageErrorKind::Validation, "script has no narration"));
        }

        let format = self.audio.format.trim().to_lowercase();
        let output = self.artifacts.audio_path(&job.id, &format);
        let audio_dir = self.artifacts.dir(ArtifactKind::Audio);
        tokio::fs::create_dir_all(&audio_dir)
            .await
            .map_err(|e| StageError::from_error(stage, e.into()))?;

        let mut parts = Vec::with_capacity(segments.len());
        for (idx, segment) in segments.iter().enumerate() {
            let bytes = speech.synthesize(segment).await.in_stage(stage)?;
            let part = audio_dir.join(format!("{}.part{}.{}", job.id, idx + 1, format));
            tokio::fs::write(&part, bytes)
                .await
                .map_err(|e| StageError::from_error(stage, e.into()))?;
            parts.push(part);
        }
        info!("Synthesized {} segments", parts.len());

        assemble(&parts, &output, &format).await.in_stage(stage)
    }

    /// Copy the finished audio into the sync directory, if one is configured.
    #[instrument(skip_all, fields(job_id = %job.id))]
    pub async fn deliver(&self, job: &Job, audio: &Path) -> StageResult<Option<PathBuf>> {
        let stage = Stage::Deliver;
        let Some(sync_dir) = &self.sync_dir else {
            debug!("No sync directory configured; skipping delivery");
            return Ok(None);
        };
        let artifact = AudioArtifact::open(audio).await.in_stage(stage)?;

        tokio::fs::create_dir_all(sync_dir)
            .await
            .map_err(|e| StageError::from_error(stage, e.into()))?;

        let dest = sync_dir.join(delivery_name(job, audio));
        let mut files = artifact.files().into_iter();
        if let Some(main) = files.next() {
            copy(main, &dest).await.in_stage(stage)?;
        }
        // Playlist parts keep their names so the listing still resolves.
        for part in files {
            if let Some(name) = part.file_name() {
                copy(part, &sync_dir.join(name)).await.in_stage(stage)?;
            }
        }

        info!("Delivered {}", dest.display());
        Ok(Some(dest))
    }
}

/// `"<source stem> - <YYYYMMDD> - <job id>.<ext>"`
fn delivery_name(job: &Job, audio: &Path) -> String {
    let title = job
        .source_filename
        .as_deref()
        .and_then(|name| Path::new(name).file_stem())
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| job.id.to_string());
    let extension = audio
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    format!("{} - {} - {}{}", title, Utc::now().format("%Y%m%d"), job.id, extension)
}

async fn copy(from: &Path, to: &Path) -> crate::error::Result<()> {
    tokio::fs::copy(from, to).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LecternError::NotFound(format!("File {}", from.display()))
        } else {
            LecternError::Io(e)
        }
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;
    use crate::pipeline::testing::{collaborators, FakeAnalyzer, FakeWriter, settings_in};
    use crate::script::Depth;
    use std::sync::Arc;

    fn job(dir: &Path, name: &str, content: &str) -> Job {
        let source = dir.join(name);
        std::fs::write(&source, content).unwrap();
        Job::with_id(JobId::from("job1"), source, Some(name.to_string()), "Notes".to_string(), Depth::Medium)
    }

    #[test]
    fn test_error_classification() {
        let not_found = StageError::from_error(Stage::Script, LecternError::NotFound("x".into()));
        assert_eq!(not_found.kind, StageErrorKind::NotFound);

        let openai = StageError::from_error(Stage::Extract, LecternError::OpenAI("timeout".into()));
        assert_eq!(openai.kind, StageErrorKind::Collaborator);
        assert_eq!(openai.to_string(), "stage extract failed (collaborator): OpenAI API error: timeout");

        let input = StageError::from_error(Stage::Extract, LecternError::InvalidInput("pptx".into()));
        assert_eq!(input.kind, StageErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_extract_repairs_once() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let analyzer = Arc::new(FakeAnalyzer::new(vec!["Sure! Here are my notes."]).with_repair(
            r#"{"chunk_summary": "Repaired summary."}"#,
        ));
        let stages = StageExecutors::new(&settings, collaborators(analyzer.clone(), Arc::new(FakeWriter::failing())));

        let job = job(dir.path(), "notes.md", "Some notes.");
        let (extractions, path) = stages.extract(&job).await.unwrap();
        assert_eq!(extractions.len(), 1);
        assert_eq!(extractions[0].summary, "Repaired summary.");
        assert_eq!(extractions[0].pages.map(|p| (p.start, p.end)), Some((1, 1)));
        assert_eq!(analyzer.repair_calls(), 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_extract_fails_when_repair_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let analyzer = Arc::new(FakeAnalyzer::new(vec!["no json"]).with_repair("still no json"));
        let stages = StageExecutors::new(&settings, collaborators(analyzer, Arc::new(FakeWriter::failing())));

        let err = stages.extract(&job(dir.path(), "notes.txt", "text")).await.unwrap_err();
        assert_eq!(err.stage, Stage::Extract);
        assert_eq!(err.kind, StageErrorKind::Validation);
        assert!(err.message.starts_with("Invalid response from model: "), "{}", err.message);
    }

    #[tokio::test]
    async fn test_extract_rejects_unsupported_source() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let stages = StageExecutors::new(
            &settings,
            collaborators(Arc::new(FakeAnalyzer::valid()), Arc::new(FakeWriter::failing())),
        );

        let err = stages.extract(&job(dir.path(), "deck.pptx", "x")).await.unwrap_err();
        assert_eq!(err.kind, StageErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_script_falls_back_on_bad_reply() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let stages = StageExecutors::new(
            &settings,
            collaborators(Arc::new(FakeAnalyzer::valid()), Arc::new(FakeWriter::replying("{\"oops\": 1}"))),
        );
        let job = job(dir.path(), "notes.md", "x");
        let extractions = vec![Extraction::from_summary("One."), Extraction::from_summary("Two.")];

        let output = stages.script(&job, &extractions).await.unwrap();
        assert!(output.used_fallback);
        assert_eq!(output.script, LectureScript::fallback(&extractions, "Notes"));
        let reloaded = stages.load_script(&output.path, Stage::Chunk).unwrap();
        assert_eq!(reloaded, output.script);
    }

    #[tokio::test]
    async fn test_deliver_without_sync_dir_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let stages = StageExecutors::new(
            &settings,
            collaborators(Arc::new(FakeAnalyzer::valid()), Arc::new(FakeWriter::failing())),
        );
        let job = job(dir.path(), "notes.md", "x");
        let result = stages.deliver(&job, &dir.path().join("missing.mp3")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_deliver_copies_playlist_and_parts() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        let sync = dir.path().join("sync");
        settings.delivery.sync_dir = Some(sync.to_string_lossy().into_owned());
        let stages = StageExecutors::new(
            &settings,
            collaborators(Arc::new(FakeAnalyzer::valid()), Arc::new(FakeWriter::failing())),
        );
        let job = job(dir.path(), "Optics.pdf", "x");

        let audio_dir = dir.path().join("audio");
        std::fs::create_dir_all(&audio_dir).unwrap();
        std::fs::write(audio_dir.join("job1.part1.wav"), b"a").unwrap();
        std::fs::write(audio_dir.join("job1.part2.wav"), b"b").unwrap();
        let playlist = audio_dir.join("job1.m3u");
        std::fs::write(&playlist, "job1.part1.wav\njob1.part2.wav").unwrap();

        let dest = stages.deliver(&job, &playlist).await.unwrap().unwrap();
        let name = dest.file_name().unwrap().to_str().unwrap().to_string();
        assert!(name.starts_with("Optics - "));
        assert!(name.ends_with(" - job1.m3u"));
        assert!(sync.join("job1.part1.wav").exists());
        assert!(sync.join("job1.part2.wav").exists());
    }

    #[tokio::test]
    async fn test_deliver_missing_audio_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.delivery.sync_dir = Some(dir.path().join("sync").to_string_lossy().into_owned());
        let stages = StageExecutors::new(
            &settings,
            collaborators(Arc::new(FakeAnalyzer::valid()), Arc::new(FakeWriter::failing())),
        );
        let job = job(dir.path(), "notes.md", "x");

        let err = stages.deliver(&job, &dir.path().join("missing.mp3")).await.unwrap_err();
        assert_eq!(err.kind, StageErrorKind::NotFound);
    }
}
