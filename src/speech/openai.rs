//! OpenAI speech endpoint.

use super::SpeechSynthesizer;
use crate::config::{AudioSettings, OpenAiSettings};
use crate::error::{LecternError, Result};
use crate::openai::{create_client_with_timeout, OpenAiClient};
use async_openai::types::{CreateSpeechRequestArgs, SpeechModel, SpeechResponseFormat, Voice};
use async_trait::async_trait;
use tracing::{debug, instrument};

pub struct OpenAiSpeech {
    client: OpenAiClient,
    model: String,
    voice: Voice,
    format: SpeechResponseFormat,
}

impl OpenAiSpeech {
    pub fn new(openai: &OpenAiSettings, audio: &AudioSettings) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(openai.request_timeout())?,
            model: audio.model.clone(),
            voice: parse_named("voice", &audio.voice)?,
            format: parse_named("audio format", &audio.format)?,
        })
    }

    /// Confirm the configured voice and format are ones the API accepts.
    pub fn check_settings(audio: &AudioSettings) -> Result<()> {
        parse_named::<Voice>("voice", &audio.voice)?;
        parse_named::<SpeechResponseFormat>("audio format", &audio.format)?;
        Ok(())
    }
}

/// Decode a lowercase API name into one of the client's enums.
fn parse_named<T: serde::de::DeserializeOwned>(what: &str, name: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(name.trim().to_lowercase()))
        .map_err(|_| LecternError::Config(format!("Unsupported {}: {}", what, name)))
}

#[async_trait]
impl SpeechSynthesizer for OpenAiSpeech {
    #[instrument(skip_all, fields(chars = text.chars().count()))]
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(SpeechModel::Other(self.model.clone()))
            .voice(self.voice.clone())
            .response_format(self.format.clone())
            .build()
            .map_err(|e| LecternError::Speech(e.to_string()))?;

        let response = self
            .client
            .audio()
            .speech(request)
            .await
            .map_err(|e| LecternError::OpenAI(format!("Speech request failed: {}", e)))?;

        debug!("Received {} bytes of audio", response.bytes.len());
        Ok(response.bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice_and_format() {
        let voice: Voice = parse_named("voice", "Nova").unwrap();
        assert_eq!(voice, Voice::Nova);
        let format: SpeechResponseFormat = parse_named("audio format", "opus").unwrap();
        assert_eq!(format, SpeechResponseFormat::Opus);
        assert!(parse_named::<SpeechResponseFormat>("audio format", "ogg").is_err());
    }
}
