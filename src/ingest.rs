//! Document submission.
//!
//! Accepts a document, stores a private copy under the uploads directory and
//! records a queued job for it. Enqueuing the returned job is up to the caller.

use crate::artifacts::write_atomic;
use crate::config::Settings;
use crate::error::{LecternError, Result};
use crate::job::{Job, JobId};
use crate::script::Depth;
use crate::store::JobStore;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Document types the extract stage can read.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "md"];

/// Per-submission choices.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Title hint; the file stem when unset.
    pub title: Option<String>,
    pub depth: Option<Depth>,
}

/// Check a document's name and size. Returns the lowercase extension.
pub fn validate_document(filename: &str, size_bytes: u64, max_bytes: u64) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(LecternError::InvalidInput(format!(
            "Unsupported file type: {} (expected one of: {})",
            if extension.is_empty() { "none".to_string() } else { format!(".{}", extension) },
            SUPPORTED_EXTENSIONS.map(|e| format!(".{}", e)).join(", ")
        )));
    }
    if size_bytes == 0 {
        return Err(LecternError::InvalidInput(format!("{} is empty", filename)));
    }
    if size_bytes > max_bytes {
        return Err(LecternError::InvalidInput(format!(
            "{} is too large ({} bytes, limit {})",
            filename, size_bytes, max_bytes
        )));
    }
    Ok(extension)
}

/// Submit a document from the local filesystem.
#[instrument(skip(settings, store, options), fields(path = %path.display()))]
pub async fn submit_file(
    settings: &Settings,
    store: &dyn JobStore,
    path: &Path,
    options: SubmitOptions,
) -> Result<Job> {
    let filename = file_name(path)?;
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LecternError::NotFound(format!("File {}", path.display()))
        } else {
            LecternError::Io(e)
        }
    })?;
    if !metadata.is_file() {
        return Err(LecternError::InvalidInput(format!("{} is not a file", path.display())));
    }
    let extension = validate_document(&filename, metadata.len(), settings.extraction.max_upload_bytes())?;

    let id = JobId::new();
    let dest = upload_path(settings, &id, &extension);
    let bytes = tokio::fs::read(path).await?;
    write_atomic(&dest, &bytes)?;

    create_job(settings, store, id, dest, filename, options).await
}

/// Submit a document received as raw bytes.
#[instrument(skip(settings, store, bytes, options), fields(size = bytes.len()))]
pub async fn submit_bytes(
    settings: &Settings,
    store: &dyn JobStore,
    filename: &str,
    bytes: &[u8],
    options: SubmitOptions,
) -> Result<Job> {
    // Never trust a client-supplied directory.
    let filename = file_name(Path::new(filename))?;
    let extension = validate_document(&filename, bytes.len() as u64, settings.extraction.max_upload_bytes())?;

    let id = JobId::new();
    let dest = upload_path(settings, &id, &extension);
    write_atomic(&dest, bytes)?;

    create_job(settings, store, id, dest, filename, options).await
}

async fn create_job(
    settings: &Settings,
    store: &dyn JobStore,
    id: JobId,
    source_path: PathBuf,
    filename: String,
    options: SubmitOptions,
) -> Result<Job> {
    let title_hint = options
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| stem(&filename));
    let depth = options.depth.unwrap_or(settings.script.depth);

    let job = Job::with_id(id, source_path, Some(filename), title_hint, depth);
    store.upsert_job(&job).await?;
    info!("Queued job {} for {}", job.id, job.source_path.display());
    Ok(job)
}

fn upload_path(settings: &Settings, id: &JobId, extension: &str) -> PathBuf {
    settings.uploads_dir().join(format!("{}.{}", id, extension))
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| LecternError::InvalidInput(format!("Missing file name: {}", path.display())))
}

fn stem(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::lecture::LectureStatus;
    use crate::store::MemoryJobStore;

    fn settings(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.general.data_dir = dir.to_string_lossy().into_owned();
        settings.extraction.max_upload_mb = 1;
        settings
    }

    #[test]
    fn test_validate_document() {
        assert_eq!(validate_document("Notes.PDF", 10, 100).unwrap(), "pdf");
        assert!(validate_document("slides.pptx", 10, 100).is_err());
        assert!(validate_document("README", 10, 100).is_err());
        assert!(validate_document("big.md", 101, 100).is_err());
        assert!(validate_document("empty.txt", 0, 100).is_err());
    }

    #[tokio::test]
    async fn test_submit_file_copies_and_queues() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = MemoryJobStore::new();

        let source = dir.path().join("Thermodynamics.md");
        std::fs::write(&source, "Heat flows from hot to cold.").unwrap();

        let job = submit_file(&settings, &store, &source, SubmitOptions::default())
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.title_hint, "Thermodynamics");
        assert_eq!(job.depth, Depth::Medium);
        assert_eq!(job.source_filename.as_deref(), Some("Thermodynamics.md"));
        assert_eq!(job.source_path, settings.uploads_dir().join(format!("{}.md", job.id)));
        assert_eq!(
            std::fs::read_to_string(&job.source_path).unwrap(),
            "Heat flows from hot to cold."
        );

        let lecture = store.require_lecture(&job.id).await.unwrap();
        assert_eq!(lecture.status, LectureStatus::Queued);
    }

    #[tokio::test]
    async fn test_submit_bytes_strips_directories_and_applies_options() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = MemoryJobStore::new();

        let options = SubmitOptions {
            title: Some("Custom".to_string()),
            depth: Some(Depth::High),
        };
        let job = submit_bytes(&settings, &store, "../../etc/notes.txt", b"text", options)
            .await
            .unwrap();

        assert_eq!(job.source_filename.as_deref(), Some("notes.txt"));
        assert_eq!(job.title_hint, "Custom");
        assert_eq!(job.depth, Depth::High);
        assert!(job.source_path.starts_with(settings.uploads_dir()));
    }

    #[tokio::test]
    async fn test_rejected_submission_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());
        let store = MemoryJobStore::new();

        let err = submit_bytes(&settings, &store, "deck.pptx", b"x", SubmitOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LecternError::InvalidInput(_)));
        assert!(store.list_jobs(&[]).await.unwrap().is_empty());

        let missing = submit_file(&settings, &store, &dir.path().join("gone.pdf"), SubmitOptions::default())
            .await
            .unwrap_err();
        assert!(missing.is_not_found());
    }
}
