//! Joining synthesized parts into one deliverable.

use crate::error::{LecternError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Finished audio: one playable file, or an ordered playlist of parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioArtifact {
    File { path: PathBuf },
    Playlist { path: PathBuf, parts: Vec<PathBuf> },
}

impl AudioArtifact {
    /// The file a player should open.
    pub fn path(&self) -> &Path {
        match self {
            AudioArtifact::File { path } => path,
            AudioArtifact::Playlist { path, .. } => path,
        }
    }

    /// Every file that makes up this artifact, the playable path first.
    pub fn files(&self) -> Vec<&Path> {
        match self {
            AudioArtifact::File { path } => vec![path.as_path()],
            AudioArtifact::Playlist { path, parts } => std::iter::once(path.as_path())
                .chain(parts.iter().map(PathBuf::as_path))
                .collect(),
        }
    }

    /// Rebuild the artifact from the path a job recorded.
    ///
    /// A `.m3u` path is read back as a playlist whose parts sit next to it.
    pub async fn open(path: &Path) -> Result<Self> {
        if !is_playlist(path) {
            if !tokio::fs::try_exists(path).await? {
                return Err(LecternError::NotFound(format!("Audio {}", path.display())));
            }
            return Ok(AudioArtifact::File {
                path: path.to_path_buf(),
            });
        }

        let listing = match tokio::fs::read_to_string(path).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(LecternError::NotFound(format!("Playlist {}", path.display())));
            }
            Err(e) => return Err(e.into()),
        };
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let parts = listing
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|name| dir.join(name))
            .collect();
        Ok(AudioArtifact::Playlist {
            path: path.to_path_buf(),
            parts,
        })
    }
}

fn is_playlist(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("m3u"))
}

/// Join `parts` (in order) into `output`.
///
/// A single part is renamed into place. Otherwise ffmpeg's concat demuxer is
/// tried first; mp3 parts can also be appended byte for byte. Any other
/// format falls back to an `.m3u` playlist next to `output` that lists the
/// parts by file name.
pub async fn assemble(parts: &[PathBuf], output: &Path, format: &str) -> Result<AudioArtifact> {
    match parts {
        [] => Err(LecternError::Speech("No audio parts to assemble".to_string())),
        [single] => {
            tokio::fs::rename(single, output).await?;
            Ok(AudioArtifact::File {
                path: output.to_path_buf(),
            })
        }
        _ => {
            match concat_with_ffmpeg(parts, output).await {
                Ok(()) => {
                    remove_parts(parts).await;
                    return Ok(AudioArtifact::File {
                        path: output.to_path_buf(),
                    });
                }
                Err(e) => warn!("ffmpeg concat unavailable: {}", e),
            }

            if format.eq_ignore_ascii_case("mp3") {
                concat_binary(parts, output).await?;
                remove_parts(parts).await;
                info!("Appended {} mp3 parts", parts.len());
                return Ok(AudioArtifact::File {
                    path: output.to_path_buf(),
                });
            }

            let playlist = output.with_extension("m3u");
            let listing = parts
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
                .collect::<Vec<_>>()
                .join("\n");
            tokio::fs::write(&playlist, listing).await?;
            info!("Wrote playlist of {} parts", parts.len());
            Ok(AudioArtifact::Playlist {
                path: playlist,
                parts: parts.to_vec(),
            })
        }
    }
}

async fn concat_with_ffmpeg(parts: &[PathBuf], output: &Path) -> Result<()> {
    let list_path = output.with_extension("concat.txt");
    let listing = parts
        .iter()
        .map(|p| format!("file '{}'", p.display().to_string().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n");
    tokio::fs::write(&list_path, listing).await?;

    debug!("Concatenating {} parts with ffmpeg", parts.len());
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-f").arg("concat")
        .arg("-safe").arg("0")
        .arg("-i").arg(&list_path)
        .arg("-c").arg("copy")
        .arg("-loglevel").arg("error")
        .arg(output)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let _ = tokio::fs::remove_file(&list_path).await;

    match result {
        Ok(out) if out.status.success() => Ok(()),
        Ok(out) => {
            let err = String::from_utf8_lossy(&out.stderr);
            Err(LecternError::ToolFailed(format!("ffmpeg concat failed: {err}")))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(LecternError::ToolNotFound("ffmpeg".into()))
        }
        Err(e) => Err(LecternError::ToolFailed(format!("ffmpeg error: {e}"))),
    }
}

async fn concat_binary(parts: &[PathBuf], output: &Path) -> Result<()> {
    let mut joined = Vec::new();
    for part in parts {
        joined.extend(tokio::fs::read(part).await?);
    }
    crate::artifacts::write_atomic(output, &joined)
}

async fn remove_parts(parts: &[PathBuf]) {
    for part in parts {
        if let Err(e) = tokio::fs::remove_file(part).await {
            debug!("Could not remove {}: {}", part.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_parts(dir: &Path, ext: &str, contents: &[&[u8]]) -> Vec<PathBuf> {
        contents
            .iter()
            .enumerate()
            .map(|(idx, bytes)| {
                let path = dir.join(format!("job.part{}.{}", idx + 1, ext));
                std::fs::write(&path, bytes).unwrap();
                path
            })
            .collect()
    }

    #[tokio::test]
    async fn test_single_part_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let parts = write_parts(dir.path(), "wav", &[b"RIFF"]);
        let output = dir.path().join("job.wav");

        let artifact = assemble(&parts, &output, "wav").await.unwrap();
        assert_eq!(artifact, AudioArtifact::File { path: output.clone() });
        assert_eq!(std::fs::read(&output).unwrap(), b"RIFF");
        assert!(!parts[0].exists());
    }

    #[tokio::test]
    async fn test_no_parts_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(assemble(&[], &dir.path().join("x.mp3"), "mp3").await.is_err());
    }

    #[tokio::test]
    async fn test_multiple_parts_yield_a_playable_artifact() {
        // Garbage bytes make ffmpeg fail when it is installed, so both
        // environments exercise a fallback.
        let dir = tempfile::tempdir().unwrap();
        let parts = write_parts(dir.path(), "opus", &[b"one", b"two"]);
        let output = dir.path().join("job.opus");

        let artifact = assemble(&parts, &output, "opus").await.unwrap();
        match &artifact {
            AudioArtifact::Playlist { path, parts: listed } => {
                assert_eq!(path, &dir.path().join("job.m3u"));
                assert_eq!(listed, &parts);
                let listing = std::fs::read_to_string(path).unwrap();
                assert_eq!(listing, "job.part1.opus\njob.part2.opus");
                assert_eq!(AudioArtifact::open(path).await.unwrap(), artifact);
            }
            AudioArtifact::File { path } => assert!(path.exists()),
        }
    }

    #[tokio::test]
    async fn test_open_reads_playlist_parts_back() {
        let dir = tempfile::tempdir().unwrap();
        let playlist = dir.path().join("job.m3u");
        std::fs::write(&playlist, "job.part1.wav\n\njob.part2.wav\n").unwrap();

        let artifact = AudioArtifact::open(&playlist).await.unwrap();
        assert_eq!(
            artifact.files(),
            vec![
                playlist.as_path(),
                dir.path().join("job.part1.wav").as_path(),
                dir.path().join("job.part2.wav").as_path(),
            ]
        );

        let single = dir.path().join("job.mp3");
        assert!(AudioArtifact::open(&single).await.unwrap_err().is_not_found());
        std::fs::write(&single, b"ID3").unwrap();
        assert_eq!(
            AudioArtifact::open(&single).await.unwrap(),
            AudioArtifact::File { path: single.clone() }
        );
        assert!(AudioArtifact::open(&dir.path().join("gone.m3u")).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_mp3_parts_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let parts = write_parts(dir.path(), "mp3", &[b"ID3a", b"ID3b"]);
        let output = dir.path().join("job.mp3");

        let artifact = assemble(&parts, &output, "mp3").await.unwrap();
        assert_eq!(artifact, AudioArtifact::File { path: output.clone() });
        assert!(output.exists());
        assert!(parts.iter().all(|p| !p.exists()));
    }
}
