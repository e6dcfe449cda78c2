//! List and status commands.

use super::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::job::{JobId, JobStatus};
use crate::lecture::JobView;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let lectures = store.list_lectures().await?;

    if lectures.is_empty() {
        Output::info("No lectures yet. Use 'lectern submit <file>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Lectures ({})", lectures.len()));
    println!();
    for lecture in &lectures {
        Output::lecture_info(lecture);
    }

    let playable = lectures.iter().filter(|l| l.is_playable()).count();
    println!();
    Output::kv("Total lectures", &lectures.len().to_string());
    Output::kv("Playable", &playable.to_string());
    Ok(())
}

/// Run the status command.
pub async fn run_status(job_id: &str, detail: bool, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let job = store.require_job(&JobId::from(job_id)).await?;
    let view = JobView::from(&job);

    Output::header(&format!("Job {}", view.job_id));
    Output::kv("Status", view.status.as_str());
    if let Some(name) = &view.source_filename {
        Output::kv("Document", name);
    }
    if let Some(title) = &job.title {
        Output::kv("Title", title);
    }
    Output::kv("Created", &view.created_at.to_rfc3339());
    Output::kv("Updated", &view.updated_at.to_rfc3339());
    Output::kv("Script ready", &view.script_ready.to_string());
    Output::kv("Audio ready", &view.audio_ready.to_string());
    if let Some(audio) = &job.audio_output {
        Output::kv("Audio", &audio.display().to_string());
    }

    if view.status == JobStatus::Failed {
        if let Some(summary) = &view.error_summary {
            Output::error(summary);
        }
        if detail {
            if let Some(diagnostic) = &job.error_detail {
                Output::kv("Detail", diagnostic);
            }
        } else {
            Output::info("Use --detail to show the diagnostic.");
        }
    }
    Ok(())
}
