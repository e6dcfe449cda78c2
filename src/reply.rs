//! Validation of free-form model replies.
//!
//! Models are asked for JSON but routinely wrap it in prose or code fences,
//! or emit LaTeX with backslashes that are not valid JSON escapes. A reply
//! is either decoded into the expected type here or handed back as raw text
//! for a repair round-trip.

use crate::error::{LecternError, Result};
use serde::de::DeserializeOwned;

/// A model reply checked against the expected payload type.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply<T> {
    /// The reply decoded into the expected shape.
    Valid(T),
    /// The reply could not be decoded; `raw` is the original text.
    NeedsRepair { raw: String, reason: String },
}

impl<T: DeserializeOwned> ModelReply<T> {
    /// Best-effort decode of a JSON object embedded in `raw`.
    pub fn parse(raw: &str) -> Self {
        let candidate = extract_json_object(strip_code_fences(raw));

        let first_error = match serde_json::from_str::<T>(candidate) {
            Ok(value) => return ModelReply::Valid(value),
            Err(e) => e,
        };

        let escaped = escape_stray_backslashes(candidate);
        if escaped != candidate {
            if let Ok(value) = serde_json::from_str::<T>(&escaped) {
                return ModelReply::Valid(value);
            }
        }

        ModelReply::NeedsRepair {
            raw: raw.to_string(),
            reason: first_error.to_string(),
        }
    }
}

impl<T> ModelReply<T> {
    /// The payload, or a validation error once no repair is left to try.
    pub fn into_result(self) -> Result<T> {
        match self {
            ModelReply::Valid(value) => Ok(value),
            ModelReply::NeedsRepair { reason, .. } => Err(LecternError::Validation(reason)),
        }
    }
}

/// Remove a surrounding markdown code fence, if the whole reply is fenced.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return text;
    }
    let Some(first_newline) = trimmed.find('\n') else {
        return text;
    };
    let body = &trimmed[first_newline + 1..];
    match body.trim_end().strip_suffix("```") {
        Some(inner) => inner.trim(),
        None => text,
    }
}

/// Slice from the first `{` to the last `}`, or the input unchanged.
pub fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Double any backslash that does not start a valid JSON escape.
fn escape_stray_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(&next) if matches!(next, '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' | 'u') => {
                out.push('\\');
                out.push(next);
                chars.next();
            }
            _ => out.push_str("\\\\"),
        }
    }
    out
}
