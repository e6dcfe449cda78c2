//! Document analysis: structured notes for each page window of a source document.

mod document;
mod openai;

pub use document::{PageRange, SourceDocument};
pub use openai::OpenAiAnalyzer;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// An equation noted by the analyzer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EquationNote {
    pub latex: String,
    pub meaning: Option<String>,
    pub intuition: Option<String>,
}

/// A figure noted by the analyzer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FigureNote {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: String,
    pub axes: Option<String>,
    pub trend: Option<String>,
    pub significance: Option<String>,
}

/// A table noted by the analyzer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNote {
    pub id: Option<String>,
    pub description: String,
    pub key_rows: Vec<serde_json::Value>,
    pub key_columns: Vec<serde_json::Value>,
}

/// Structured understanding of one page window.
///
/// Only `summary` is mandatory; everything else defaults to empty so that
/// terse but well-formed replies still validate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Pages this extraction covers, filled in by the extract stage.
    #[serde(default)]
    pub pages: Option<PageRange>,
    #[serde(alias = "chunk_summary")]
    pub summary: String,
    #[serde(default, alias = "key_definitions")]
    pub definitions: Vec<serde_json::Value>,
    #[serde(default)]
    pub theorems: Vec<serde_json::Value>,
    #[serde(default)]
    pub equations: Vec<EquationNote>,
    #[serde(default)]
    pub figures: Vec<FigureNote>,
    #[serde(default)]
    pub tables: Vec<TableNote>,
}

impl Extraction {
    /// An extraction holding only a summary.
    pub fn from_summary(summary: &str) -> Self {
        Self {
            pages: None,
            summary: summary.to_string(),
            definitions: Vec::new(),
            theorems: Vec::new(),
            equations: Vec::new(),
            figures: Vec::new(),
            tables: Vec::new(),
        }
    }
}

/// External document-analysis service.
///
/// Implementations return the model's raw reply; validation and the single
/// repair round-trip belong to the extract stage.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    /// Analyze one page window of `document`.
    async fn analyze(&self, document: &SourceDocument, pages: PageRange) -> Result<String>;

    /// Ask the service to turn a malformed reply into valid JSON.
    async fn repair(&self, raw: &str) -> Result<String>;
}
