//! Script to chunk segmentation.

use super::{estimate_seconds, normalize_whitespace, split_sentences, LectureChunk, RECAP_SECTION};
use crate::script::LectureScript;

/// One chapter's worth of material in segmentation order.
struct Section {
    name: String,
    narration: String,
    math_lines: Vec<String>,
}

/// Cut `script` into chunks of roughly `target_seconds` each.
///
/// Chapters are visited in order, then the recap. Narration sentences are
/// buffered until the buffer's estimate reaches the target. A chapter's
/// spoken equations follow its narration as one separate chunk. Chunks never
/// span two chapters. The output depends only on the inputs.
pub fn segment(script: &LectureScript, target_seconds: u32, words_per_second: f64) -> Vec<LectureChunk> {
    let mut chunks = Vec::new();

    for section in sections(script) {
        if !section.narration.is_empty() {
            let mut buffer: Vec<String> = Vec::new();
            for sentence in split_sentences(&section.narration) {
                buffer.push(sentence);
                if estimate_seconds(&buffer.join(" "), words_per_second) >= target_seconds {
                    push_chunk(&mut chunks, &section.name, &buffer.join(" "), None, words_per_second);
                    buffer.clear();
                }
            }
            if !buffer.is_empty() {
                push_chunk(&mut chunks, &section.name, &buffer.join(" "), None, words_per_second);
            }
        }

        if !section.math_lines.is_empty() {
            let math_text = section.math_lines.join(" ");
            push_chunk(
                &mut chunks,
                &section.name,
                &math_text,
                Some(section.math_lines),
                words_per_second,
            );
        }
    }

    chunks
}

fn sections(script: &LectureScript) -> Vec<Section> {
    let mut sections: Vec<Section> = script
        .chapters
        .iter()
        .map(|chapter| {
            let mut parts = vec![chapter.narration.clone()];
            parts.extend(chapter.figure_narration.iter().map(|f| f.to_text()));
            Section {
                name: chapter.name.clone(),
                narration: normalize_whitespace(&parts.join(" ")),
                math_lines: chapter.spoken_math_lines(),
            }
        })
        .collect();

    let recap = normalize_whitespace(&script.final_recap);
    if !recap.is_empty() {
        sections.push(Section {
            name: RECAP_SECTION.to_string(),
            narration: recap,
            math_lines: Vec::new(),
        });
    }
    sections
}

fn push_chunk(
    chunks: &mut Vec<LectureChunk>,
    section_name: &str,
    text: &str,
    spoken_math: Option<Vec<String>>,
    words_per_second: f64,
) {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return;
    }
    chunks.push(LectureChunk {
        chunk_id: chunks.len(),
        approx_seconds: estimate_seconds(&text, words_per_second),
        text,
        spoken_math,
        section_name: section_name.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::tests::sample_script;
    use crate::script::{Chapter, SpokenMath};

    fn chapter(name: &str, narration: &str) -> Chapter {
        Chapter {
            name: name.to_string(),
            narration: narration.to_string(),
            spoken_math: Vec::new(),
            figure_narration: Vec::new(),
        }
    }

    #[test]
    fn test_ids_are_dense_from_zero() {
        let chunks = segment(&sample_script(), 3, 2.5);
        assert!(chunks.len() > 3);
        for (idx, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, idx);
            assert!(chunk.approx_seconds >= 1);
        }
    }

    #[test]
    fn test_closes_buffer_at_target() {
        let mut script = sample_script();
        script.chapters = vec![chapter("Only", "One two three four five. Six seven. Eight nine ten eleven twelve.")];
        script.final_recap = String::new();

        // 5 words / 2.5 = 2s reaches target 2; 2 words is 1s; 7 words total is 3s.
        let chunks = segment(&script, 2, 2.5);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["One two three four five.", "Six seven. Eight nine ten eleven twelve."]
        );
        assert_eq!(chunks[0].approx_seconds, 2);
        assert_eq!(chunks[1].approx_seconds, 3);
    }

    #[test]
    fn test_half_second_estimate_rounds_to_even() {
        let mut script = sample_script();
        script.chapters = vec![chapter("Only", "One two three four five. Six. Seven eight.")];
        script.final_recap = String::new();

        // 5 words / 2.0 = 2.5 rounds down to 2, short of target 3.
        let chunks = segment(&script, 3, 2.0);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["One two three four five. Six.", "Seven eight."]);
        assert_eq!(chunks[0].approx_seconds, 3);
        assert_eq!(chunks[1].approx_seconds, 1);
    }

    #[test]
    fn test_chunks_do_not_cross_chapters() {
        let mut script = sample_script();
        script.chapters = vec![chapter("A", "Short one."), chapter("B", "Short two.")];
        script.final_recap = String::new();

        let chunks = segment(&script, 100, 2.5);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].section_name, "A");
        assert_eq!(chunks[1].section_name, "B");
    }

    #[test]
    fn test_math_is_a_separate_trailing_chunk() {
        let script = sample_script();
        let chunks = segment(&script, 100, 2.5);

        let intuition: Vec<&LectureChunk> =
            chunks.iter().filter(|c| c.section_name == "Intuition").collect();
        assert_eq!(intuition.len(), 2);
        assert!(!intuition[0].is_math());
        assert!(intuition[0].text.contains("Which way do you step?"));
        assert!(intuition[0].text.contains("Axes: weights versus loss."));

        let math = intuition[1];
        assert_eq!(
            math.spoken_math.as_deref(),
            Some(&script.chapters[0].spoken_math_lines()[..])
        );
        assert_eq!(
            math.text,
            "theta becomes theta minus eta times the gradient of the loss Step against the slope."
        );
    }

    #[test]
    fn test_empty_narration_and_blank_math_produce_nothing() {
        let mut script = sample_script();
        let mut silent = chapter("Silent", "   ");
        silent.spoken_math.push(SpokenMath {
            latex: "x".to_string(),
            spoken: " ".to_string(),
            intuition: None,
        });
        script.chapters = vec![silent];
        script.final_recap = "  ".to_string();

        assert!(segment(&script, 15, 2.5).is_empty());
    }

    #[test]
    fn test_recap_is_last_section() {
        let chunks = segment(&sample_script(), 15, 2.5);
        let last = chunks.last().unwrap();
        assert_eq!(last.section_name, RECAP_SECTION);
        assert_eq!(last.text, "Follow the negative gradient with a sensible step size.");
    }

    #[test]
    fn test_text_covers_narration() {
        let script = sample_script();
        let joined = segment(&script, 2, 2.5)
            .iter()
            .map(|c| c.text.clone())
            .collect::<Vec<_>>()
            .join(" ");
        for chapter in &script.chapters {
            assert!(joined.contains(&normalize_whitespace(&chapter.narration)));
        }
        assert!(joined.contains(&script.final_recap));
    }

    #[test]
    fn test_segmenting_is_deterministic() {
        let script = sample_script();
        let first = serde_json::to_string(&segment(&script, 4, 2.5)).unwrap();
        let second = serde_json::to_string(&segment(&script, 4, 2.5)).unwrap();
        assert_eq!(first, second);
    }
}
