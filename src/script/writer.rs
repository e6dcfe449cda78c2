//! Script generation through a text-generation model.

use super::{Depth, LectureScript};
use crate::config::{OpenAiSettings, Prompts};
use crate::error::{LecternError, Result};
use crate::extraction::Extraction;
use crate::openai::{complete, create_client_with_timeout, OpenAiClient};
use crate::reply::ModelReply;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::instrument;

/// External text-generation service that writes lecture scripts.
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Return the raw model reply for the given extractions.
    async fn write_script(
        &self,
        extractions: &[Extraction],
        title_hint: &str,
        depth: Depth,
    ) -> Result<String>;
}

/// Decode a script reply. A script without chapters is not usable.
pub fn parse_script(raw: &str) -> ModelReply<LectureScript> {
    match ModelReply::<LectureScript>::parse(raw) {
        ModelReply::Valid(script) if script.chapters.is_empty() => ModelReply::NeedsRepair {
            raw: raw.to_string(),
            reason: "script has no chapters".to_string(),
        },
        reply => reply,
    }
}

pub struct OpenAiScriptWriter {
    client: OpenAiClient,
    model: String,
    prompts: Prompts,
}

impl OpenAiScriptWriter {
    pub fn new(settings: &OpenAiSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(settings.request_timeout())?,
            model: settings.script_model.clone(),
            prompts,
        })
    }
}

#[async_trait]
impl ScriptWriter for OpenAiScriptWriter {
    #[instrument(skip(self, extractions), fields(extractions = extractions.len()))]
    async fn write_script(
        &self,
        extractions: &[Extraction],
        title_hint: &str,
        depth: Depth,
    ) -> Result<String> {
        let payload = serde_json::to_string(extractions)
            .map_err(|e| LecternError::Script(format!("Failed to encode extractions: {}", e)))?;

        let mut vars = HashMap::new();
        vars.insert("title_hint".to_string(), title_hint.to_string());
        vars.insert("extractions".to_string(), payload);
        vars.insert(
            "depth_instructions".to_string(),
            depth.instructions().to_string(),
        );

        let system = Prompts::render(&self.prompts.script.system, &vars);
        let user = Prompts::render(&self.prompts.script.user, &vars);
        complete(&self.client, &self.model, system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_reply() {
        let raw = r#"```json
{
  "title": "Vectors",
  "chapters": [
    {"name": "Basics", "narration": "A vector has a size and a direction.",
     "spoken_math": [{"latex": "\|v\|", "spoken": "the norm of v"}]}
  ],
  "final_recap": "Vectors carry magnitude and direction."
}
```"#;
        let ModelReply::Valid(script) = parse_script(raw) else {
            panic!("expected a valid script");
        };
        assert_eq!(script.title, "Vectors");
        assert_eq!(script.source_type, "pdf");
        assert_eq!(script.chapters[0].spoken_math[0].latex, r"\|v\|");
    }

    #[test]
    fn test_script_without_chapters_is_rejected() {
        let raw = r#"{"title": "Empty", "chapters": [], "final_recap": ""}"#;
        match parse_script(raw) {
            ModelReply::NeedsRepair { reason, .. } => assert!(reason.contains("no chapters")),
            ModelReply::Valid(_) => panic!("empty script accepted"),
        }
    }

    #[test]
    fn test_script_missing_title_is_rejected() {
        let raw = r#"{"chapters": [{"name": "A", "narration": "B."}]}"#;
        assert!(parse_script(raw).into_result().is_err());
    }
}
