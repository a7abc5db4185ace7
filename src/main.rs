//! Tablica command-line entry point.
//!
//! `watch` runs the periodic re-check loop; `timetable` and
//! `substitutions` run one fetch-parse-cache cycle and print the result
//! as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use tablica::application::{LogSink, ScrapeService, Watcher};
use tablica::infrastructure::config::ConfigManager;
use tablica::infrastructure::logging::init_logging_with_config;

#[derive(Parser)]
#[command(name = "tablica")]
#[command(about = "School timetable & substitutions scraping service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to the per-user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch both pages periodically and log detected changes.
    Watch,

    /// Fetch, parse and print one class timetable as JSON.
    Timetable {
        /// Class code in timetable format (e.g. `2d`)
        class: String,

        /// Refetch even when the cached snapshot is fresh
        #[arg(long)]
        force: bool,
    },

    /// Fetch, parse and print the substitutions bulletin as JSON.
    Substitutions {
        /// Refetch even when the cached snapshot is fresh
        #[arg(long)]
        force: bool,

        /// Fail on document-shape mismatches instead of degrading
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new().context("Failed to locate the configuration directory")?,
    };
    let config = manager
        .load_config()
        .await
        .context("Failed to load configuration")?;

    init_logging_with_config(&config.logging).context("Failed to initialize logging")?;

    let mut service =
        ScrapeService::new(config).context("Failed to start the scrape service")?;

    match cli.command {
        Command::Watch => {
            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl-C, stopping the watch loop");
                    signal_token.cancel();
                }
            });

            Watcher::new(service, LogSink).run(shutdown).await?;
        }
        Command::Timetable { class, force } => {
            let refreshed = service.refresh_timetable(&class, force).await?;
            println!("{}", serde_json::to_string_pretty(&refreshed.current)?);
        }
        Command::Substitutions { force, strict } => {
            service.hydrate().await;
            let refreshed = service.refresh_substitutions(force, strict).await?;
            println!("{}", serde_json::to_string_pretty(&refreshed.current)?);
        }
    }

    Ok(())
}
