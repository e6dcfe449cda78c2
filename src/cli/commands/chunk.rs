//! Chunk and context commands.

use super::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::job::JobId;
use crate::library::Library;
use anyhow::Result;

/// Run the chunk command.
pub async fn run_chunk(job_id: &str, index: usize, settings: Settings) -> Result<()> {
    let library = Library::new(&settings, open_store(&settings)?);
    let chunk = library.chunk(&JobId::from(job_id), index).await?;
    Output::chunk(&chunk);
    Ok(())
}

/// Run the context command.
pub async fn run_context(job_id: &str, index: usize, window: Option<u32>, settings: Settings) -> Result<()> {
    let library = Library::new(&settings, open_store(&settings)?);
    let context = library.context(&JobId::from(job_id), index, window).await?;

    if context.text.is_empty() {
        Output::info("No narration precedes this chunk.");
        return Ok(());
    }
    Output::kv("Seconds", &context.duration_sec.to_string());
    println!("\n{}", context.text);
    Ok(())
}
