//! The processing pipeline.
//!
//! A single worker drains the submission queue and moves each job through
//! extract, script, chunk and (optionally) synthesize-audio and deliver,
//! persisting the job after every stage.

mod queue;
mod stages;
mod worker;

pub use queue::{channel, recover, Dequeue, QueueReceiver, SubmissionQueue};
pub use stages::{ScriptOutput, Stage, StageError, StageErrorKind, StageExecutors, StageResult};
pub use worker::Worker;

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::extraction::{DocumentAnalyzer, OpenAiAnalyzer};
use crate::script::{OpenAiScriptWriter, ScriptWriter};
use crate::speech::{OpenAiSpeech, SpeechSynthesizer};
use std::sync::Arc;
use tracing::info;

/// External services the stages call.
#[derive(Clone)]
pub struct Collaborators {
    pub analyzer: Arc<dyn DocumentAnalyzer>,
    pub writer: Arc<dyn ScriptWriter>,
    /// Only needed when audio is enabled.
    pub speech: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Collaborators {
    /// OpenAI-backed collaborators built from settings.
    pub fn openai(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

        let analyzer = Arc::new(OpenAiAnalyzer::new(&settings.openai, prompts.clone())?);
        let writer = Arc::new(OpenAiScriptWriter::new(&settings.openai, prompts)?);
        let speech: Option<Arc<dyn SpeechSynthesizer>> = if settings.audio.enabled {
            Some(Arc::new(OpenAiSpeech::new(&settings.openai, &settings.audio)?))
        } else {
            None
        };

        info!(
            "Using {} for analysis, {} for scripts, audio {}",
            settings.openai.analysis_model,
            settings.openai.script_model,
            if speech.is_some() { "enabled" } else { "disabled" }
        );

        Ok(Self {
            analyzer,
            writer,
            speech,
        })
    }
}
