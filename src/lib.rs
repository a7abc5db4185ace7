//! Tablica - school timetable & substitutions scraping service
//!
//! Scrapes a school's published lesson timetable pages and the daily
//! substitutions bulletin into typed data models, caches JSON snapshots,
//! and periodically re-checks both pages to detect and surface changes.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the main entry types for easier access
pub use application::{ChangeEvent, ChangeSink, LogSink, ScrapeService, Watcher};
pub use domain::{SubstitutionsPost, Timetable};
pub use infrastructure::{AppConfig, ConfigManager};
