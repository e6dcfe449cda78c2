//! On-disk stage outputs, one file per artifact per job.
//!
//! Every write lands in a temporary file next to its target and is renamed
//! into place, so a reader sees either the previous file or the complete new
//! one.

use crate::error::{LecternError, Result};
use crate::job::JobId;
use serde::{de::DeserializeOwned, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// The stage outputs kept per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Extraction,
    Script,
    Chunks,
    Audio,
}

impl ArtifactKind {
    fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Extraction => "extracted",
            ArtifactKind::Script => "scripts",
            ArtifactKind::Chunks => "chunks",
            ArtifactKind::Audio => "audio",
        }
    }
}

/// Artifact files rooted at the data directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Location of a JSON artifact for `id`.
    pub fn json_path(&self, kind: ArtifactKind, id: &JobId) -> PathBuf {
        self.dir(kind).join(format!("{}.json", id))
    }

    /// Location of an audio file for `id` with the given extension.
    pub fn audio_path(&self, id: &JobId, extension: &str) -> PathBuf {
        self.dir(ArtifactKind::Audio)
            .join(format!("{}.{}", id, extension))
    }

    /// Serialize `value` and write it atomically. Returns the final path.
    pub fn write_json<T: Serialize>(&self, kind: ArtifactKind, id: &JobId, value: &T) -> Result<PathBuf> {
        let path = self.json_path(kind, id);
        let content = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &content)?;
        debug!("Wrote {:?} artifact {}", kind, path.display());
        Ok(path)
    }

    /// Read a JSON artifact; a missing file is not-found.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LecternError::NotFound(format!("Artifact {}", path.display()))
            } else {
                LecternError::Io(e)
            }
        })?;
        Ok(serde_json::from_slice(&content)?)
    }
}

/// Write `bytes` to `path` through a sibling temporary file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| LecternError::InvalidInput(format!("No parent directory: {}", path.display())))?;
    std::fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| LecternError::Io(e.error))?;
    Ok(())
}
