//! Logging system configuration and initialization
//!
//! This module provides the logging setup with:
//! - Configuration file based log level control
//! - Console and non-blocking file output support
//! - Structured JSON logging for the file output (optional)
//! - `RUST_LOG` environment variable override

#![allow(clippy::uninlined_format_args)]

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

use crate::infrastructure::config::ConfigManager;

// Re-export LoggingConfig from config module
pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
static LOG_GUARDS: Lazy<Mutex<Vec<WorkerGuard>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Get the log directory for the given configuration
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    if let Some(dir) = &config.log_dir {
        return dir.clone();
    }
    ConfigManager::get_app_data_dir()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|_| PathBuf::from("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    let config = LoggingConfig::default();
    init_logging_with_config(&config)
}

/// Initialize logging with custom configuration
///
/// Dependency internals (reqwest, hyper, tokio) are held at `info`/`warn`
/// unless the configured level is `trace`; `RUST_LOG` overrides everything:
///
/// ```bash
/// RUST_LOG="debug,reqwest=debug,hyper=debug" tablica watch
/// ```
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(&config.level);

        if !config.level.to_lowercase().contains("trace") {
            filter = filter
                // HTTP client detailed logs - only show on TRACE
                .add_directive("reqwest=info".parse().unwrap())
                .add_directive("hyper=warn".parse().unwrap())
                .add_directive("h2=warn".parse().unwrap())
                // Tokio runtime details - only show on TRACE
                .add_directive("tokio=info".parse().unwrap())
                .add_directive("runtime=warn".parse().unwrap())
                // HTML parsing internals - only show on TRACE
                .add_directive("html5ever=warn".parse().unwrap())
                .add_directive("selectors=warn".parse().unwrap())
                // Keep our application logs at the requested level
                .add_directive(format!("tablica={}", config.level).parse().unwrap());
        }

        filter
    });

    let registry = Registry::default().with(env_filter);

    match (config.file_output, config.console_output) {
        (true, console) => {
            let log_dir = get_log_directory(config);
            std::fs::create_dir_all(&log_dir)
                .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", log_dir, e))?;

            let file_appender = rolling::never(&log_dir, "tablica.log");
            let (file_writer, file_guard) = non_blocking(file_appender);

            // Store the guard globally to prevent it from being dropped
            LOG_GUARDS.lock().unwrap().push(file_guard);

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);
                let console_layer = console.then(|| {
                    fmt::Layer::new()
                        .with_writer(std::io::stdout)
                        .with_target(false)
                });
                registry.with(file_layer).with(console_layer).init();
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(file_writer)
                    .with_target(false)
                    .with_ansi(false);
                let console_layer = console.then(|| {
                    fmt::Layer::new()
                        .with_writer(std::io::stdout)
                        .with_target(false)
                });
                registry.with(file_layer).with(console_layer).init();
            }
        }
        (false, _) => {
            let console_layer = fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_target(false);
            registry.with(console_layer).init();
        }
    }

    tracing::info!("Logging initialized at level '{}'", config.level);
    Ok(())
}
