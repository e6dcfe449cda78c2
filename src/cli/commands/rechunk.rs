//! Rechunk command implementation.

use super::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::job::JobId;
use crate::library::Library;
use anyhow::Result;

/// Run the rechunk command.
pub async fn run_rechunk(job_id: &str, settings: Settings) -> Result<()> {
    let library = Library::new(&settings, open_store(&settings)?);

    if job_id == "all" {
        let ids = library.rechunkable().await?;

        if ids.is_empty() {
            Output::warning("No finished lectures with a stored script found.");
            return Ok(());
        }

        Output::info(&format!("Found {} lectures to rechunk", ids.len()));
        println!();

        let mut success_count = 0;
        let mut error_count = 0;

        for (i, id) in ids.iter().enumerate() {
            match library.rechunk(id).await {
                Ok(result) => {
                    Output::success(&format!(
                        "[{}/{}] {} ({} chunks)",
                        i + 1,
                        ids.len(),
                        result.title,
                        result.chunks
                    ));
                    success_count += 1;
                }
                Err(e) => {
                    Output::error(&format!("[{}/{}] {}: {}", i + 1, ids.len(), id, e));
                    error_count += 1;
                }
            }
        }

        println!();
        Output::info(&format!(
            "Rechunking complete: {} succeeded, {} failed",
            success_count, error_count
        ));
    } else {
        let spinner = Output::spinner("Rechunking...");

        match library.rechunk(&JobId::from(job_id)).await {
            Ok(result) => {
                spinner.finish_and_clear();
                Output::success(&format!(
                    "Successfully rechunked '{}' ({} chunks)",
                    result.title, result.chunks
                ));
            }
            Err(e) => {
                spinner.finish_and_clear();
                Output::error(&format!("Failed to rechunk: {}", e));
                return Err(e.into());
            }
        }
    }

    Ok(())
}
