//! Lectern CLI entry point.

use anyhow::Result;
use clap::Parser;
use lectern::cli::{commands, Cli, Commands};
use lectern::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_deref().map(Settings::expand_path);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lectern={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;
    std::fs::create_dir_all(settings.uploads_dir())?;

    // Execute command
    match &cli.command {
        Commands::Doctor => {
            commands::run_doctor(&settings)?;
        }

        Commands::Submit { file, title, depth } => {
            commands::run_submit(file, title.clone(), depth.as_deref(), settings).await?;
        }

        Commands::Process { inputs, depth } => {
            commands::run_process(inputs, depth.as_deref(), settings).await?;
        }

        Commands::Worker => {
            commands::run_worker(settings).await?;
        }

        Commands::Status { job_id, detail } => {
            commands::run_status(job_id, *detail, settings).await?;
        }

        Commands::List => {
            commands::run_list(settings).await?;
        }

        Commands::Chunk { job_id, index } => {
            commands::run_chunk(job_id, *index, settings).await?;
        }

        Commands::Context { job_id, index, window } => {
            commands::run_context(job_id, *index, *window, settings).await?;
        }

        Commands::Rechunk { job_id } => {
            commands::run_rechunk(job_id, settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
