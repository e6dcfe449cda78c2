//! Chat-completion document analyzer.

use super::{DocumentAnalyzer, PageRange, SourceDocument};
use crate::config::{OpenAiSettings, Prompts};
use crate::error::Result;
use crate::openai::{complete, create_client_with_timeout, OpenAiClient};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::instrument;

/// Analyzes page windows by sending their text to a chat model.
pub struct OpenAiAnalyzer {
    client: OpenAiClient,
    model: String,
    repair_model: String,
    prompts: Prompts,
}

impl OpenAiAnalyzer {
    pub fn new(settings: &OpenAiSettings, prompts: Prompts) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(settings.request_timeout())?,
            model: settings.analysis_model.clone(),
            repair_model: settings.repair_model.clone(),
            prompts,
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for OpenAiAnalyzer {
    #[instrument(skip(self, document), fields(document = %document.name, pages = %pages))]
    async fn analyze(&self, document: &SourceDocument, pages: PageRange) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("document".to_string(), document.name.clone());
        vars.insert("start_page".to_string(), pages.start.to_string());
        vars.insert("end_page".to_string(), pages.end.to_string());
        vars.insert("pages".to_string(), document.text(pages));

        let system = Prompts::render(&self.prompts.analysis.system, &vars);
        let user = Prompts::render(&self.prompts.analysis.user, &vars);
        complete(&self.client, &self.model, system, user).await
    }

    #[instrument(skip_all)]
    async fn repair(&self, raw: &str) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("raw".to_string(), raw.to_string());

        let user = Prompts::render(&self.prompts.analysis.repair, &vars);
        complete(
            &self.client,
            &self.repair_model,
            "You repair malformed JSON.".to_string(),
            user,
        )
        .await
    }
}
