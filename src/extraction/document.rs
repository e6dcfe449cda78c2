//! Source documents split into pages.

use crate::error::{LecternError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Inclusive, one-based page range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Extracted text of a document, one entry per page.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub name: String,
    pages: Vec<String>,
}

impl SourceDocument {
    pub fn from_pages(name: impl Into<String>, pages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            pages,
        }
    }

    /// Load a PDF page by page, or a plain-text file as a single page.
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let pages = match extension.as_str() {
            "pdf" => load_pdf_pages(path)?,
            "txt" | "md" => vec![std::fs::read_to_string(path)?],
            other => {
                return Err(LecternError::InvalidInput(format!(
                    "Unsupported document type: .{}",
                    other
                )))
            }
        };

        debug!("Loaded {} pages from {}", pages.len(), name);
        Ok(Self { name, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Consecutive windows of at most `max_pages` covering every page.
    pub fn windows(&self, max_pages: usize) -> Vec<PageRange> {
        let step = max_pages.max(1);
        let total = self.pages.len();
        let mut windows = Vec::new();
        let mut start = 1;
        while start <= total {
            let end = (start + step - 1).min(total);
            windows.push(PageRange { start, end });
            start = end + 1;
        }
        windows
    }

    /// Text of the pages in `range`, pages separated by a marker line.
    pub fn text(&self, range: PageRange) -> String {
        let first = range.start.saturating_sub(1);
        let last = range.end.min(self.pages.len());
        if first >= last {
            return String::new();
        }
        self.pages[first..last]
            .iter()
            .enumerate()
            .map(|(offset, text)| format!("--- Page {} ---\n{}", range.start + offset, text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn load_pdf_pages(path: &Path) -> Result<Vec<String>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| LecternError::Extraction(format!("Failed to load PDF: {}", e)))?;

    let mut pages = Vec::new();
    for (page_num, _) in doc.get_pages() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!("No text on page {}: {}", page_num, e);
                pages.push(String::new());
            }
        }
    }

    if pages.is_empty() {
        return Err(LecternError::Extraction("PDF has no pages".to_string()));
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: usize) -> SourceDocument {
        SourceDocument::from_pages("doc", (1..=n).map(|i| format!("page {}", i)).collect())
    }

    #[test]
    fn test_windows_cover_all_pages() {
        assert_eq!(
            doc(7).windows(3),
            vec![
                PageRange { start: 1, end: 3 },
                PageRange { start: 4, end: 6 },
                PageRange { start: 7, end: 7 },
            ]
        );
        assert_eq!(doc(2).windows(0).len(), 2);
        assert!(doc(0).windows(3).is_empty());
    }

    #[test]
    fn test_text_of_range() {
        let text = doc(4).text(PageRange { start: 2, end: 3 });
        assert_eq!(text, "--- Page 2 ---\npage 2\n\n--- Page 3 ---\npage 3");
        assert_eq!(doc(2).text(PageRange { start: 5, end: 6 }), "");
    }

    #[test]
    fn test_load_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\nSome text.").unwrap();
        let doc = SourceDocument::load(&path).unwrap();
        assert_eq!(doc.name, "notes.md");
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn test_load_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slides.pptx");
        std::fs::write(&path, b"binary").unwrap();
        assert!(matches!(
            SourceDocument::load(&path),
            Err(LecternError::InvalidInput(_))
        ));
    }
}
