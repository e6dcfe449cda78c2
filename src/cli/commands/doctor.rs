//! Doctor command - check that the pipeline can run with the current settings.

use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::speech::OpenAiSpeech;
use console::style;
use std::process::Command;

#[derive(Debug, PartialEq)]
enum Level {
    Ok,
    Warning,
    Error,
}

/// Outcome of one check.
#[derive(Debug)]
struct Finding {
    name: &'static str,
    level: Level,
    message: String,
    hint: Option<String>,
}

impl Finding {
    fn ok(name: &'static str, message: impl Into<String>) -> Self {
        Self { name, level: Level::Ok, message: message.into(), hint: None }
    }

    fn warning(name: &'static str, message: impl Into<String>, hint: &str) -> Self {
        Self { name, level: Level::Warning, message: message.into(), hint: Some(hint.to_string()) }
    }

    fn error(name: &'static str, message: impl Into<String>, hint: &str) -> Self {
        Self { name, level: Level::Error, message: message.into(), hint: Some(hint.to_string()) }
    }

    fn print(&self) {
        let icon = match self.level {
            Level::Ok => style("✓").green(),
            Level::Warning => style("!").yellow(),
            Level::Error => style("✗").red(),
        };
        println!("  {} {} - {}", icon, style(self.name).bold(), self.message);
        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all checks, grouped by concern.
pub fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Lectern Doctor");
    println!();

    let groups: [(&str, Vec<Finding>); 4] = [
        ("Credentials", vec![check_api_key(std::env::var("OPENAI_API_KEY").ok())]),
        (
            "Pipeline settings",
            vec![check_settings(settings), check_models(settings), check_prompts(settings)],
        ),
        ("Audio", vec![check_speech(settings), check_ffmpeg(settings)]),
        ("Delivery", vec![check_sync_dir(settings)]),
    ];

    let mut errors = 0;
    let mut warnings = 0;
    for (title, findings) in &groups {
        println!("{}", style(title).bold());
        for finding in findings {
            finding.print();
            match finding.level {
                Level::Error => errors += 1,
                Level::Warning => warnings += 1,
                Level::Ok => {}
            }
        }
        println!();
    }

    if errors > 0 {
        Output::error(&format!("{} problem(s) would stop jobs from running.", errors));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("Ready, with {} warning(s).", warnings));
    } else {
        Output::success("Ready to process documents.");
    }
    Ok(())
}

fn check_api_key(key: Option<String>) -> Finding {
    match key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            let tail: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
            Finding::ok("OPENAI_API_KEY", format!("set (...{})", tail))
        }
        Some(_) => Finding::error("OPENAI_API_KEY", "empty", "export OPENAI_API_KEY='sk-...'"),
        None => Finding::error("OPENAI_API_KEY", "not set", "export OPENAI_API_KEY='sk-...'"),
    }
}

/// The numeric limits the segmenter and extractor rely on.
fn check_settings(settings: &Settings) -> Finding {
    match settings.validate() {
        Ok(()) => Finding::ok(
            "Chunking",
            format!(
                "{}s chunks at {} words/s, {}s context",
                settings.chunking.target_seconds,
                settings.chunking.words_per_second,
                settings.chunking.context_window_seconds
            ),
        ),
        Err(e) => Finding::error("Chunking", e.to_string(), "Fix with: lectern config edit"),
    }
}

fn check_models(settings: &Settings) -> Finding {
    let openai = &settings.openai;
    let models = [
        ("analysis", &openai.analysis_model),
        ("repair", &openai.repair_model),
        ("script", &openai.script_model),
    ];
    if let Some((role, _)) = models.iter().find(|(_, model)| model.trim().is_empty()) {
        return Finding::error(
            "Models",
            format!("no {} model configured", role),
            "Set openai.<role>_model in the config file",
        );
    }
    Finding::ok(
        "Models",
        models
            .iter()
            .map(|(role, model)| format!("{} {}", role, model))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

fn check_prompts(settings: &Settings) -> Finding {
    let Some(dir) = settings.prompts.custom_dir.as_deref() else {
        return Finding::ok("Prompts", "built-in");
    };
    if !Settings::expand_path(dir).is_dir() {
        return Finding::warning(
            "Prompts",
            format!("{} does not exist; using built-in prompts", dir),
            "Create it or unset prompts.custom_dir",
        );
    }
    match Prompts::load(Some(dir)) {
        Ok(_) => Finding::ok("Prompts", format!("custom ({})", dir)),
        Err(e) => Finding::error(
            "Prompts",
            e.to_string(),
            "analysis.toml and script.toml must define every prompt field",
        ),
    }
}

fn check_speech(settings: &Settings) -> Finding {
    let audio = &settings.audio;
    if !audio.enabled {
        return Finding::ok("Speech", "disabled");
    }
    if audio.model.trim().is_empty() {
        return Finding::error("Speech", "no speech model configured", "Set audio.model");
    }
    match OpenAiSpeech::check_settings(audio) {
        Ok(()) => Finding::ok(
            "Speech",
            format!("{}, voice {}, {}", audio.model, audio.voice, audio.format),
        ),
        Err(e) => Finding::error("Speech", e.to_string(), "Check audio.voice and audio.format"),
    }
}

/// Only multi-part audio needs ffmpeg, and assembly has fallbacks without it.
fn check_ffmpeg(settings: &Settings) -> Finding {
    if !settings.audio.enabled {
        return Finding::ok("ffmpeg", "not needed while audio is disabled");
    }
    match Command::new("ffmpeg").arg("-version").output() {
        Ok(output) if output.status.success() => Finding::ok("ffmpeg", "available"),
        _ => Finding::warning(
            "ffmpeg",
            "not found; long lectures are appended as mp3 or listed in a playlist",
            install_hint_ffmpeg(),
        ),
    }
}

fn check_sync_dir(settings: &Settings) -> Finding {
    let Some(dir) = settings.sync_dir() else {
        return Finding::ok("Sync folder", "not configured; lectures stay in the data directory");
    };
    if let Err(e) = std::fs::create_dir_all(&dir) {
        return Finding::error(
            "Sync folder",
            format!("{}: {}", dir.display(), e),
            "Point delivery.sync_dir at a writable directory",
        );
    }
    match tempfile::NamedTempFile::new_in(&dir) {
        Ok(_) => Finding::ok("Sync folder", dir.display().to_string()),
        Err(e) => Finding::error(
            "Sync folder",
            format!("{} is not writable: {}", dir.display(), e),
            "Point delivery.sync_dir at a writable directory",
        ),
    }
}

fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
