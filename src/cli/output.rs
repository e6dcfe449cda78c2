//! CLI output formatting utilities.

use crate::chunking::LectureChunk;
use crate::lecture::{Lecture, LectureStatus};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one lecture line.
    pub fn lecture_info(lecture: &Lecture) {
        let status = match lecture.status {
            LectureStatus::Done => style(lecture.status.as_str()).green(),
            LectureStatus::Failed => style(lecture.status.as_str()).red(),
            _ => style(lecture.status.as_str()).yellow(),
        };
        let duration = lecture
            .duration_sec
            .map(|d| format_duration(d as f64))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} {} ({}, {}, {})",
            style("*").cyan(),
            style(&lecture.title).bold(),
            style(lecture.id.as_str()).dim(),
            status,
            duration
        );
    }

    /// Print a playback chunk.
    pub fn chunk(chunk: &LectureChunk) {
        println!(
            "\n{} #{} {} (~{}s)",
            style(">>").green(),
            chunk.chunk_id,
            style(&chunk.section_name).bold(),
            chunk.approx_seconds
        );
        println!("   {}", chunk.text);
        if let Some(lines) = &chunk.spoken_math {
            for line in lines {
                println!("   {} {}", style("=").dim(), style(line).dim());
            }
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}
