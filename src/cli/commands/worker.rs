//! Long-running worker command.

use super::open_store;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::pipeline::{self, Collaborators, Worker};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the worker command.
///
/// Unfinished jobs are re-enqueued first. After that the worker polls the
/// store for jobs queued by `lectern submit` whenever it is idle.
pub async fn run_worker(settings: Settings) -> Result<()> {
    preflight::check(Operation::Process, &settings)?;

    let store = open_store(&settings)?;
    let worker = Worker::new(&settings, store.clone(), Collaborators::openai(&settings)?).polling_store();

    let (queue, receiver) = pipeline::channel();
    let recovered = pipeline::recover(store.as_ref(), &queue).await?;
    if recovered == 0 {
        Output::info("No unfinished jobs.");
    } else {
        Output::info(&format!("Resuming {} unfinished jobs", recovered));
    }

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Output::warning("Stopping after the current stage...");
            ctrl_c.cancel();
        }
    });

    // Keep the handle alive so the worker idles instead of exiting once the
    // recovered jobs are drained.
    let _queue = queue;
    Output::info("Worker running. Press Ctrl+C to stop.");
    worker.run(receiver, shutdown).await;
    Output::success("Worker stopped.");
    Ok(())
}
