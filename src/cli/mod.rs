//! CLI module for Lectern.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lectern - narrated lectures from documents
///
/// Turns PDFs and notes into lecture scripts, playback chunks and
/// (optionally) synthesized audio.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check system requirements and configuration
    Doctor,

    /// Store a document and queue it for processing
    Submit {
        /// PDF, text or markdown file
        file: String,

        /// Title hint for the script (defaults to the file name)
        #[arg(short, long)]
        title: Option<String>,

        /// Script depth (low, medium, high)
        #[arg(short, long)]
        depth: Option<String>,
    },

    /// Submit documents and process them to completion
    Process {
        /// Files or directories of documents
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Script depth (low, medium, high)
        #[arg(short, long)]
        depth: Option<String>,
    },

    /// Run the worker until interrupted, resuming unfinished jobs first
    Worker,

    /// Show a job's status
    Status {
        /// Job ID
        job_id: String,

        /// Include the operator diagnostic for failed jobs
        #[arg(long)]
        detail: bool,
    },

    /// List lectures
    List,

    /// Print one playback chunk
    Chunk {
        /// Job ID
        job_id: String,

        /// Zero-based chunk index
        index: usize,
    },

    /// Print the narration leading up to a chunk
    Context {
        /// Job ID
        job_id: String,

        /// Zero-based chunk index
        index: usize,

        /// Lookback window in seconds (defaults to the configured window)
        #[arg(short, long)]
        window: Option<u32>,
    },

    /// Regenerate playback chunks from the stored script
    Rechunk {
        /// Job ID to rechunk (use 'all' to rechunk every finished lecture)
        job_id: String,
    },

    /// Start the HTTP API with an in-process worker
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
