//! Playback chunks: a lecture script cut into short, bounded-duration units.
//!
//! Durations are estimates from a words-per-second speaking rate, never
//! measured audio.

mod context;
mod segmenter;

pub use context::{chunk_at, context};
pub use segmenter::segment;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid sentence regex"));

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").expect("valid word regex"));

/// Section name given to chunks cut from the closing recap.
pub const RECAP_SECTION: &str = "Recap";

/// One playback unit of a lecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureChunk {
    /// Zero-based position in the lecture.
    pub chunk_id: usize,
    /// Estimated spoken duration.
    pub approx_seconds: u32,
    pub text: String,
    /// Present only on chunks cut from a chapter's spoken equations.
    pub spoken_math: Option<Vec<String>>,
    /// Chapter the chunk came from.
    pub section_name: String,
}

impl LectureChunk {
    pub fn is_math(&self) -> bool {
        self.spoken_math.is_some()
    }
}

/// Collapse every run of whitespace into one space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on `.`, `!` or `?` followed by whitespace. The punctuation stays
/// with its sentence; empty fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let cleaned = normalize_whitespace(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let mut sentences = Vec::new();
    let mut start = 0;
    for boundary in SENTENCE_END.find_iter(&cleaned) {
        // The punctuation marks are all one byte wide.
        push_fragment(&mut sentences, &cleaned[start..boundary.start() + 1]);
        start = boundary.end();
    }
    push_fragment(&mut sentences, &cleaned[start..]);
    sentences
}

fn push_fragment(sentences: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        sentences.push(fragment.to_string());
    }
}

/// Estimated speaking time in whole seconds.
///
/// Zero words gives 0; any words give at least 1. Halves round to even.
pub fn estimate_seconds(text: &str, words_per_second: f64) -> u32 {
    let words = WORD.find_iter(text).count();
    if words == 0 {
        return 0;
    }
    let seconds = (words as f64 / words_per_second).round_ties_even();
    if seconds.is_finite() {
        (seconds as u32).max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("  One.  Two!\nThree?   Four"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
        assert_eq!(split_sentences("Version 2.5 is out."), vec!["Version 2.5 is out."]);
        assert!(split_sentences(" \n\t ").is_empty());
    }

    #[test]
    fn test_estimate_seconds() {
        assert_eq!(estimate_seconds("", 2.5), 0);
        assert_eq!(estimate_seconds("... !!", 2.5), 0);
        assert_eq!(estimate_seconds("word", 2.5), 1);
        // 5 words / 2.5 = 2
        assert_eq!(estimate_seconds("one two three four five", 2.5), 2);
        // 4 words / 2.5 = 1.6
        assert_eq!(estimate_seconds("one two three four", 2.5), 2);
        // Halves go to the even neighbour: 1.5 -> 2, 2.5 -> 2
        assert_eq!(estimate_seconds("one two three", 2.0), 2);
        assert_eq!(estimate_seconds("one two three four five", 2.0), 2);
        // 0.5 -> 0, lifted to the minimum of 1
        assert_eq!(estimate_seconds("one", 2.0), 1);
    }

    #[test]
    fn test_estimate_is_at_least_one_for_any_words() {
        for text in ["a", "a b", "x.", "naïve café"] {
            assert!(estimate_seconds(text, 100.0) >= 1, "{text}");
        }
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\n b\tc  "), "a b c");
    }
}
