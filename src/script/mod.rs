//! Lecture scripts: the narrated form of an extracted document.
//!
//! A script is produced once per job by the script stage, either from the
//! text-generation model or, when its reply cannot be used, from the
//! extraction summaries directly.

mod writer;

pub use writer::{parse_script, OpenAiScriptWriter, ScriptWriter};

use crate::extraction::Extraction;
use serde::{Deserialize, Serialize};

/// Recap used by the fallback script.
const FALLBACK_RECAP: &str = "We covered the main ideas from the document.";

/// How much detail the script should keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Low,
    #[default]
    Medium,
    High,
}

impl Depth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Low => "low",
            Depth::Medium => "medium",
            Depth::High => "high",
        }
    }

    /// Prompt guidance for this depth.
    pub fn instructions(&self) -> &'static str {
        match self {
            Depth::Low => {
                "Depth: low. Prioritize the big ideas and clarity. Omit most minor details and \
                 derivations. Keep narration concise but still accurate."
            }
            Depth::Medium => {
                "Depth: medium. Balance clarity and detail. Include the main concepts, key \
                 definitions, and the most important equations."
            }
            Depth::High => {
                "Depth: high. Preserve as much detail as possible from the page analyses. Do not \
                 summarize away key definitions, assumptions, equations, caveats, or nuanced \
                 explanations. Longer narration is acceptable."
            }
        }
    }
}

impl std::str::FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Depth::Low),
            "medium" => Ok(Depth::Medium),
            "high" => Ok(Depth::High),
            _ => Err(format!("Unknown depth: {} (expected low, medium or high)", s)),
        }
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An equation rendered for speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokenMath {
    /// Original notation.
    #[serde(default)]
    pub latex: String,
    /// Natural-language rendering.
    pub spoken: String,
    #[serde(default)]
    pub intuition: Option<String>,
}

/// Spoken description of a figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FigureNarration {
    #[serde(default)]
    pub figure_id: Option<String>,
    pub description: String,
    #[serde(default)]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub axes: Option<String>,
    #[serde(default)]
    pub trend: Option<String>,
    #[serde(default)]
    pub significance: Option<String>,
}

impl FigureNarration {
    /// The figure as narration sentences.
    pub fn to_text(&self) -> String {
        let mut sentences = vec![self.description.clone()];
        if let Some(axes) = non_empty(&self.axes) {
            sentences.push(format!("Axes: {}.", axes));
        }
        if let Some(trend) = non_empty(&self.trend) {
            sentences.push(format!("Trend: {}.", trend));
        }
        if let Some(significance) = non_empty(&self.significance) {
            sentences.push(format!("Significance: {}.", significance));
        }
        sentences.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub narration: String,
    #[serde(default)]
    pub spoken_math: Vec<SpokenMath>,
    #[serde(default)]
    pub figure_narration: Vec<FigureNarration>,
}

impl Chapter {
    /// Spoken equations and their intuitions, one line each, blanks dropped.
    pub fn spoken_math_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for item in &self.spoken_math {
            lines.push(item.spoken.trim().to_string());
            if let Some(intuition) = &item.intuition {
                lines.push(intuition.trim().to_string());
            }
        }
        lines.retain(|line| !line.is_empty());
        lines
    }
}

/// The narrated lecture for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LectureScript {
    pub title: String,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default)]
    pub duration_estimate_sec: u32,
    pub chapters: Vec<Chapter>,
    #[serde(default)]
    pub final_recap: String,
}

fn default_source_type() -> String {
    "pdf".to_string()
}

impl LectureScript {
    /// Minimal script built straight from the extraction summaries.
    ///
    /// One chapter per extracted page window, in order.
    pub fn fallback(extractions: &[Extraction], title_hint: &str) -> Self {
        let chapters: Vec<Chapter> = extractions
            .iter()
            .enumerate()
            .map(|(idx, extraction)| {
                let summary = extraction.summary.trim();
                Chapter {
                    name: format!("Section {}", idx + 1),
                    narration: if summary.is_empty() {
                        "Summary missing.".to_string()
                    } else {
                        summary.to_string()
                    },
                    spoken_math: Vec::new(),
                    figure_narration: Vec::new(),
                }
            })
            .collect();

        let title = if title_hint.trim().is_empty() {
            "Lecture".to_string()
        } else {
            title_hint.to_string()
        };

        Self {
            title,
            source_type: default_source_type(),
            duration_estimate_sec: (60 * chapters.len() as u32).max(60),
            chapters,
            final_recap: FALLBACK_RECAP.to_string(),
        }
    }

    /// Chapter names, skipping blanks.
    pub fn outline(&self) -> Vec<String> {
        self.chapters
            .iter()
            .map(|c| c.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Plain narration text for speech synthesis, one cue per line.
    pub fn to_narration(&self) -> String {
        let mut parts = vec![format!("Title: {}.", self.title)];

        for (idx, chapter) in self.chapters.iter().enumerate() {
            parts.push(format!("Chapter {}: {}.", idx + 1, chapter.name));
            parts.push(chapter.narration.trim().to_string());

            if !chapter.spoken_math.is_empty() {
                parts.push("Let's pause for the key equations.".to_string());
                parts.extend(chapter.spoken_math_lines());
            }

            if !chapter.figure_narration.is_empty() {
                parts.push("Now a quick tour of the figures.".to_string());
                for figure in &chapter.figure_narration {
                    parts.push(figure.description.clone());
                    parts.extend(non_empty(&figure.trend).map(str::to_string));
                    parts.extend(non_empty(&figure.significance).map(str::to_string));
                }
            }

            parts.push("We'll pause briefly.".to_string());
        }

        parts.push("Final recap.".to_string());
        parts.push(self.final_recap.trim().to_string());
        parts.join("\n")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_script() -> LectureScript {
        LectureScript {
            title: "Gradient Descent".to_string(),
            source_type: "pdf".to_string(),
            duration_estimate_sec: 120,
            chapters: vec![
                Chapter {
                    name: "Intuition".to_string(),
                    narration: "Imagine standing on a hill. You want to reach the valley! \
                                Which way do you step?"
                        .to_string(),
                    spoken_math: vec![SpokenMath {
                        latex: r"\theta \leftarrow \theta - \eta \nabla L".to_string(),
                        spoken: "theta becomes theta minus eta times the gradient of the loss"
                            .to_string(),
                        intuition: Some("Step against the slope.".to_string()),
                    }],
                    figure_narration: vec![FigureNarration {
                        figure_id: Some("fig1".to_string()),
                        description: "A bowl-shaped loss surface.".to_string(),
                        chart_type: None,
                        axes: Some("weights versus loss".to_string()),
                        trend: Some("loss falls toward the center".to_string()),
                        significance: None,
                    }],
                },
                Chapter {
                    name: "Learning rate".to_string(),
                    narration: "Too large and you overshoot. Too small and you crawl.".to_string(),
                    spoken_math: Vec::new(),
                    figure_narration: Vec::new(),
                },
            ],
            final_recap: "Follow the negative gradient with a sensible step size.".to_string(),
        }
    }

    #[test]
    fn test_depth_parse() {
        assert_eq!("HIGH".parse::<Depth>().unwrap(), Depth::High);
        assert_eq!(" low ".parse::<Depth>().unwrap(), Depth::Low);
        assert!("deep".parse::<Depth>().is_err());
        assert_eq!(Depth::default(), Depth::Medium);
    }

    #[test]
    fn test_fallback_one_chapter_per_extraction() {
        let extractions = vec![
            Extraction::from_summary("First pages cover definitions."),
            Extraction::from_summary(""),
        ];
        let script = LectureScript::fallback(&extractions, "notes");
        assert_eq!(script.title, "notes");
        assert_eq!(script.chapters.len(), 2);
        assert_eq!(script.chapters[0].name, "Section 1");
        assert_eq!(script.chapters[0].narration, "First pages cover definitions.");
        assert_eq!(script.chapters[1].narration, "Summary missing.");
        assert_eq!(script.duration_estimate_sec, 120);
        assert_eq!(script.final_recap, FALLBACK_RECAP);
        assert_eq!(script, LectureScript::fallback(&extractions, "notes"));
    }

    #[test]
    fn test_fallback_without_title() {
        let script = LectureScript::fallback(&[], "  ");
        assert_eq!(script.title, "Lecture");
        assert_eq!(script.duration_estimate_sec, 60);
    }

    #[test]
    fn test_spoken_math_lines_skip_blanks() {
        let mut script = sample_script();
        script.chapters[0].spoken_math.push(SpokenMath {
            latex: String::new(),
            spoken: "  ".to_string(),
            intuition: None,
        });
        assert_eq!(
            script.chapters[0].spoken_math_lines(),
            vec![
                "theta becomes theta minus eta times the gradient of the loss".to_string(),
                "Step against the slope.".to_string(),
            ]
        );
    }

    #[test]
    fn test_figure_text() {
        let script = sample_script();
        assert_eq!(
            script.chapters[0].figure_narration[0].to_text(),
            "A bowl-shaped loss surface. Axes: weights versus loss. Trend: loss falls toward the center."
        );
    }

    #[test]
    fn test_narration_layout() {
        let narration = sample_script().to_narration();
        let lines: Vec<&str> = narration.lines().collect();
        assert_eq!(lines[0], "Title: Gradient Descent.");
        assert_eq!(lines[1], "Chapter 1: Intuition.");
        assert!(lines.contains(&"Let's pause for the key equations."));
        assert!(lines.contains(&"Now a quick tour of the figures."));
        assert_eq!(lines[lines.len() - 2], "Final recap.");
    }

    #[test]
    fn test_outline() {
        assert_eq!(sample_script().outline(), vec!["Intuition", "Learning rate"]);
    }
}
