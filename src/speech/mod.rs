//! Speech synthesis for finished scripts.
//!
//! Narration is split into segments that fit one synthesis request, each
//! segment is voiced separately, and the parts are then joined into one file
//! or listed in a playlist.

mod assemble;
mod openai;

pub use assemble::{assemble, AudioArtifact};
pub use openai::OpenAiSpeech;

use crate::error::Result;
use async_trait::async_trait;

/// External text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Voice `text` and return the encoded audio.
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Split narration into segments of at most `max_chars` characters.
///
/// Whole lines are packed together where they fit. A line longer than the
/// budget is broken between words, and a single word longer than the budget
/// is broken between characters.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut size = 0;

    for line in text.lines().flat_map(|line| split_long_line(line, max_chars)) {
        let line_len = line.chars().count();
        let added = if buffer.is_empty() { line_len } else { line_len + 1 };
        if size + added > max_chars && !buffer.is_empty() {
            segments.push(std::mem::take(&mut buffer));
            size = 0;
        }
        if !buffer.is_empty() {
            buffer.push('\n');
            size += 1;
        }
        buffer.push_str(&line);
        size += line_len;
    }
    if !buffer.trim().is_empty() {
        segments.push(buffer);
    }
    segments.retain(|s| !s.trim().is_empty());
    segments
}

fn split_long_line(line: &str, max_chars: usize) -> Vec<String> {
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        for part in split_long_word(word, max_chars) {
            let needed = if current.is_empty() {
                part.chars().count()
            } else {
                current.chars().count() + 1 + part.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&part);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

fn split_long_word(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}
