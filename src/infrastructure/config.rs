//! Configuration infrastructure
//!
//! Contains configuration loading and management for the scraping service.
//!
//! Configuration is organized into four tiers:
//! 1. School/source settings (URLs, class plan map, container selectors)
//! 2. Fetch settings (user agent, timeout, rate limit)
//! 3. Watch settings (re-check interval, snapshot directory)
//! 4. Logging settings

#![allow(clippy::derivable_impls)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::infrastructure::parsing::DEFAULT_CONTAINER_SELECTORS;

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// School/source settings
    pub school: SchoolConfig,

    /// Fetch settings
    pub fetch: FetchConfig,

    /// Watch-loop settings
    pub watch: WatchConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// School site settings: where the two document kinds live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchoolConfig {
    /// Base URL of the generated timetable pages.
    pub timetable_base_url: String,

    /// Class code to plan page file name (`"2d"` -> `"o12.html"`).
    ///
    /// Plan ids are assigned by the site's timetable generator and do not
    /// follow a formula stable across school years, so they are configured
    /// rather than computed.
    pub classes: BTreeMap<String, String>,

    /// URL of the substitutions bulletin page.
    pub substitutions_url: String,

    /// Fallback selectors for the bulletin post container, tried in order.
    pub post_container_selectors: Vec<String>,
}

impl SchoolConfig {
    /// Full URL of one class's timetable page, if the class is configured.
    pub fn timetable_url(&self, class: &str) -> Option<String> {
        let plan = self.classes.get(class)?;
        let base = self.timetable_base_url.trim_end_matches('/');
        Some(format!("{base}/{plan}"))
    }
}

/// Fetch settings for the rate-limited HTTP client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent string
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Maximum requests per second against the school server
    pub max_requests_per_second: u32,

    /// Whether to follow redirects
    pub follow_redirects: bool,
}

/// Watch-loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Minutes between re-checks of both pages
    pub interval_minutes: u64,

    /// Snapshot directory; the per-user data directory when unset
    pub cache_dir: Option<PathBuf>,
}

/// Logging configuration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Enable JSON formatted logs in the file output
    pub json_format: bool,

    /// Log directory; the per-user data directory when unset
    pub log_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            school: SchoolConfig::default(),
            fetch: FetchConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for SchoolConfig {
    fn default() -> Self {
        Self {
            timetable_base_url: "https://szkola.example.pl/plan/plany/".to_string(),
            classes: BTreeMap::new(),
            substitutions_url: "https://szkola.example.pl/zastepstwa/".to_string(),
            post_container_selectors: DEFAULT_CONTAINER_SELECTORS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "tablica/0.3 (school-info bot)".to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 2,
            follow_redirects: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
            cache_dir: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            json_format: false,
            log_dir: None,
        }
    }
}

/// Configuration file manager
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("tablica");

        Ok(config_dir)
    }

    /// Get application data directory (snapshots, logs)
    pub fn get_app_data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to get user data directory")?
            .join("tablica");

        Ok(data_dir)
    }

    /// Create a new configuration manager at the default path
    pub fn new() -> Result<Self> {
        let config_dir = Self::get_config_dir()?;
        let config_path = config_dir.join("tablica.json");

        Ok(Self { config_path })
    }

    /// Create a configuration manager for an explicit file path
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Configuration file not found, creating default: {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        serde_json::from_str::<AppConfig>(&content).with_context(|| {
            format!(
                "Failed to parse configuration file: {:?}",
                self.config_path
            )
        })
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }
}
