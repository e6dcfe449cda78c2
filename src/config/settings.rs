//! Configuration settings for Lectern.

use crate::script::Depth;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub openai: OpenAiSettings,
    pub extraction: ExtractionSettings,
    pub script: ScriptSettings,
    pub chunking: ChunkingSettings,
    pub audio: AudioSettings,
    pub delivery: DeliverySettings,
    pub worker: WorkerSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for uploads, artifacts and the job database.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lectern".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Models and client behaviour for the OpenAI collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    /// Model used to analyze page windows.
    pub analysis_model: String,
    /// Model used to repair malformed JSON replies.
    pub repair_model: String,
    /// Model used to write the lecture script.
    pub script_model: String,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            analysis_model: "gpt-4.1".to_string(),
            repair_model: "gpt-4.1-mini".to_string(),
            script_model: "gpt-4.1".to_string(),
            request_timeout_secs: 300,
        }
    }
}

impl OpenAiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Document intake and analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Pages sent to the analyzer per request.
    pub max_pages_per_window: usize,
    /// Largest accepted upload, in megabytes.
    pub max_upload_mb: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_pages_per_window: 3,
            max_upload_mb: 50,
        }
    }
}

impl ExtractionSettings {
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }
}

/// Script generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScriptSettings {
    /// Default depth for new submissions.
    pub depth: Depth,
}

/// Playback chunk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// A chunk is closed once its estimate reaches this many seconds.
    pub target_seconds: u32,
    /// Speaking rate used for duration estimates.
    pub words_per_second: f64,
    /// Default lookback window for context retrieval.
    pub context_window_seconds: u32,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            target_seconds: 15,
            words_per_second: 2.5,
            context_window_seconds: 60,
        }
    }
}

/// Speech synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Run the synthesize-audio and deliver stages.
    pub enabled: bool,
    /// Speech model.
    pub model: String,
    /// Voice name (alloy, ash, coral, echo, fable, onyx, nova, sage, shimmer).
    pub voice: String,
    /// Output format (mp3, opus, aac, flac, wav, pcm).
    pub format: String,
    /// Character budget per synthesis request.
    pub max_segment_chars: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "gpt-4o-mini-tts".to_string(),
            voice: "alloy".to_string(),
            format: "mp3".to_string(),
            max_segment_chars: 3000,
        }
    }
}

/// Where finished audio is copied.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeliverySettings {
    /// Sync directory (e.g. a cloud drive folder). Delivery is skipped when unset.
    pub sync_dir: Option<String>,
}

/// Worker loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// How long one dequeue waits before checking for a stop signal.
    pub poll_interval_ms: u64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl WorkerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            settings.validate()?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::LecternError;

        if !(self.chunking.words_per_second > 0.0) {
            return Err(LecternError::Config(
                "chunking.words_per_second must be positive".to_string(),
            ));
        }
        if self.chunking.target_seconds == 0 {
            return Err(LecternError::Config(
                "chunking.target_seconds must be at least 1".to_string(),
            ));
        }
        if self.extraction.max_pages_per_window == 0 {
            return Err(LecternError::Config(
                "extraction.max_pages_per_window must be at least 1".to_string(),
            ));
        }
        if self.audio.max_segment_chars == 0 {
            return Err(LecternError::Config(
                "audio.max_segment_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LecternError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lectern")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Directory holding stored copies of submitted documents.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir().join("uploads")
    }

    /// Path of the SQLite job database.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir().join("lectern.db")
    }

    /// Expanded sync directory, if delivery is configured.
    pub fn sync_dir(&self) -> Option<PathBuf> {
        self.delivery
            .sync_dir
            .as_deref()
            .filter(|dir| !dir.trim().is_empty())
            .map(Self::expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.chunking.target_seconds, 15);
        assert_eq!(settings.chunking.words_per_second, 2.5);
        assert_eq!(settings.extraction.max_pages_per_window, 3);
        assert!(!settings.audio.enabled);
        assert!(settings.sync_dir().is_none());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [chunking]
            target_seconds = 30

            [audio]
            enabled = true

            [script]
            depth = "high"
            "#,
        )
        .unwrap();
        assert_eq!(settings.chunking.target_seconds, 30);
        assert_eq!(settings.chunking.words_per_second, 2.5);
        assert!(settings.audio.enabled);
        assert_eq!(settings.audio.format, "mp3");
        assert_eq!(settings.script.depth, Depth::High);
    }

    #[test]
    fn test_validate_rejects_zero_rate() {
        let mut settings = Settings::default();
        settings.chunking.words_per_second = 0.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut settings = Settings::default();
        settings.delivery.sync_dir = Some("/tmp/sync".to_string());
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.sync_dir(), Some(PathBuf::from("/tmp/sync")));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let loaded = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(loaded.worker.poll_interval_ms, 500);
    }
}
