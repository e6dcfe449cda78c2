//! OpenAI client construction and the chat call shared by the adapters.

use crate::error::{LecternError, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::time::Duration;
use tracing::debug;

pub type OpenAiClient = Client<OpenAIConfig>;

/// Create an OpenAI client whose HTTP requests time out after `timeout`.
pub fn create_client_with_timeout(timeout: Duration) -> Result<OpenAiClient> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Client::with_config(OpenAIConfig::default()).with_http_client(http_client))
}

/// Send one system + user exchange and return the reply text.
pub async fn complete(
    client: &OpenAiClient,
    model: &str,
    system: String,
    user: String,
) -> Result<String> {
    let messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system)
            .build()
            .map_err(|e| LecternError::OpenAI(e.to_string()))?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user)
            .build()
            .map_err(|e| LecternError::OpenAI(e.to_string()))?
            .into(),
    ];

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .temperature(0.3)
        .build()
        .map_err(|e| LecternError::OpenAI(e.to_string()))?;

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e| LecternError::OpenAI(format!("Chat completion failed: {}", e)))?;

    let content = response
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .ok_or_else(|| LecternError::OpenAI("Empty response from model".to_string()))?;

    debug!("Model reply: {}", truncate(&content, 500));
    Ok(content)
}

/// At most `max` bytes of `text`, cut on a char boundary.
pub fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abcdef", 3), "abc");
    }
}
