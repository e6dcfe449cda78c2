//! Configuration module for Lectern.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{AnalysisPrompts, Prompts, ScriptPrompts};
pub use settings::{
    AudioSettings, ChunkingSettings, DeliverySettings, ExtractionSettings, GeneralSettings,
    OpenAiSettings, PromptSettings, ScriptSettings, Settings, WorkerSettings,
};
