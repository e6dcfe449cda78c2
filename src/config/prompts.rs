//! Prompt templates for Lectern.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub analysis: AnalysisPrompts,
    pub script: ScriptPrompts,
}

/// Prompts for page-window analysis and JSON repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisPrompts {
    pub system: String,
    pub user: String,
    pub repair: String,
}

impl Default for AnalysisPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are analyzing a PDF lecture or paper. Extract a structured understanding of the pages you are given.

Output JSON only, with keys:
- "chunk_summary": a faithful summary of the pages
- "key_definitions": terms defined on these pages
- "theorems": statements of theorems, lemmas or results
- "equations": a list of {"latex", "meaning", "intuition"}
- "figures": a list of {"id", "type", "description", "axes", "trend", "significance"}
- "tables": a list of {"id", "description", "key_rows", "key_columns"}

Do not add commentary or code fences."#
                .to_string(),

            user: r#"Document: {{document}}
Focus ONLY on pages {{start_page}} to {{end_page}}.

{{pages}}"#
                .to_string(),

            repair: r#"Fix the following JSON. Return ONLY valid JSON with the same keys/structure. Do not add commentary or code fences.

{{raw}}"#
                .to_string(),
        }
    }
}

/// Prompts for lecture script generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ScriptPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert lecturer and storyteller. Given page analyses, produce a lecture script JSON.

Follow this schema strictly:
{"title", "source_type", "duration_estimate_sec", "chapters": [{"name", "narration", "spoken_math": [{"latex", "spoken", "intuition"}], "figure_narration": [{"figure_id", "description", "chart_type", "axes", "trend", "significance"}]}], "final_recap"}

Rules:
- Narration must be natural spoken text, no raw LaTeX
- For spoken_math, convert LaTeX into speech, defining terms if they have not yet been introduced
- Figure descriptions must be detailed enough to construct a mental image; cover axes and units, trends, comparisons, and why the figure matters
- Use vivid, precise language, emphasize concrete examples, and keep momentum
- Include smooth transitions between chapters

{{depth_instructions}}"#
                .to_string(),

            user: r#"Title hint: {{title_hint}}

Page analyses:
{{extractions}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts, overriding defaults with any TOML files in `custom_dir`.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let analysis_path = custom_path.join("analysis.toml");
            if analysis_path.exists() {
                let content = std::fs::read_to_string(&analysis_path)?;
                prompts.analysis = toml::from_str(&content)?;
            }

            let script_path = custom_path.join("script.toml");
            if script_path.exists() {
                let content = std::fs::read_to_string(&script_path)?;
                prompts.script = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.analysis.user.contains("{{start_page}}"));
        assert!(prompts.analysis.repair.contains("{{raw}}"));
        assert!(prompts.script.system.contains("{{depth_instructions}}"));
    }

    #[test]
    fn test_render_template() {
        let template = "Pages {{start_page}} to {{end_page}}.";
        let mut vars = HashMap::new();
        vars.insert("start_page".to_string(), "4".to_string());
        vars.insert("end_page".to_string(), "6".to_string());

        assert_eq!(Prompts::render(template, &vars), "Pages 4 to 6.");
    }

    #[test]
    fn test_custom_dir_overrides_one_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("script.toml"),
            "system = \"Be brief. {{depth_instructions}}\"\nuser = \"{{extractions}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.script.system, "Be brief. {{depth_instructions}}");
        assert_eq!(prompts.analysis.system, AnalysisPrompts::default().system);
    }
}
