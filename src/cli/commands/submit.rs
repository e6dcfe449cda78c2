//! Submit and batch-process commands.

use super::{open_store, parse_depth};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::ingest::{self, SubmitOptions, SUPPORTED_EXTENSIONS};
use crate::job::{JobId, JobStatus};
use crate::pipeline::{Collaborators, Worker};
use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Run the submit command.
///
/// The job is only queued. A running `lectern worker` or `lectern serve`
/// picks it up the next time its worker is idle.
pub async fn run_submit(file: &str, title: Option<String>, depth: Option<&str>, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let options = SubmitOptions {
        title,
        depth: parse_depth(depth)?,
    };

    let job = ingest::submit_file(&settings, store.as_ref(), &Settings::expand_path(file), options).await?;

    Output::success(&format!("Queued {}", job.source_filename.as_deref().unwrap_or(file)));
    Output::kv("Job ID", job.id.as_str());
    Output::kv("Depth", job.depth.as_str());
    Output::info("Run 'lectern worker' to process queued jobs.");
    Ok(())
}

/// Run the process command: submit every input, then work through them in order.
pub async fn run_process(inputs: &[String], depth: Option<&str>, settings: Settings) -> Result<()> {
    preflight::check(Operation::Process, &settings)?;

    let files = collect_documents(inputs)?;
    if files.is_empty() {
        Output::warning("No supported documents found (.pdf, .txt, .md).");
        return Ok(());
    }

    let store = open_store(&settings)?;
    let depth = parse_depth(depth)?;

    let mut ids: Vec<(JobId, String)> = Vec::new();
    for file in &files {
        let options = SubmitOptions { title: None, depth };
        match ingest::submit_file(&settings, store.as_ref(), file, options).await {
            Ok(job) => ids.push((job.id, file.display().to_string())),
            Err(e) => Output::error(&format!("Skipping {}: {}", file.display(), e)),
        }
    }

    let worker = Worker::new(&settings, store.clone(), Collaborators::openai(&settings)?);
    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let progress = Output::progress_bar(ids.len() as u64, "Processing");
    let mut done = 0;
    let mut failed = 0;
    for (id, name) in &ids {
        progress.set_message(name.clone());
        match worker.process_job(id, &shutdown).await? {
            Some(JobStatus::Done) => done += 1,
            Some(JobStatus::Failed) => {
                failed += 1;
                progress.println(format!("Failed: {} ({})", name, id));
            }
            _ => {}
        }
        progress.inc(1);
        if shutdown.is_cancelled() {
            break;
        }
    }
    progress.finish_and_clear();

    let pending = ids.len() - done - failed;
    Output::info(&format!(
        "Processing complete: {} done, {} failed, {} pending",
        done, failed, pending
    ));
    if pending > 0 {
        Output::info("Pending jobs resume with 'lectern worker'.");
    }
    Ok(())
}

/// Expand directories (one level) into the supported documents they hold.
fn collect_documents(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Settings::expand_path(input);
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(&path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_supported(p))
                .collect();
            entries.sort();
            files.extend(entries);
        } else {
            files.push(path);
        }
    }
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}
