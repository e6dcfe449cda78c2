//! Lookback context for a chunk.

use super::LectureChunk;
use crate::error::{LecternError, Result};

/// The chunk at `index`, or not-found when out of range.
pub fn chunk_at(chunks: &[LectureChunk], index: usize) -> Result<&LectureChunk> {
    chunks.get(index).ok_or_else(|| {
        LecternError::NotFound(format!(
            "Chunk {} (lecture has {} chunks)",
            index,
            chunks.len()
        ))
    })
}

/// Text of the chunks before `index`, reaching back about `window_seconds`.
///
/// Walks backward from `index - 1` and stops once the accumulated estimate
/// reaches the window; the chunk that crosses the window is kept. Returns
/// the texts in reading order joined by newlines, with their total seconds.
/// Callers check `index` with [`chunk_at`] first.
pub fn context(chunks: &[LectureChunk], index: usize, window_seconds: u32) -> (String, u32) {
    let mut total: u32 = 0;
    let mut collected: Vec<&str> = Vec::new();

    for chunk in chunks[..index.min(chunks.len())].iter().rev() {
        if total >= window_seconds {
            break;
        }
        if !chunk.text.is_empty() {
            collected.push(&chunk.text);
        }
        total = total.saturating_add(chunk.approx_seconds);
    }

    collected.reverse();
    (collected.join("\n").trim().to_string(), total)
}
