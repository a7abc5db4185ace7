//! Application layer module
//!
//! This module contains the scrape service and the watch loop
//! that orchestrate the domain and infrastructure layers.

pub mod scrape_service;
pub mod watcher;

pub use scrape_service::ScrapeService;
pub use watcher::{ChangeEvent, ChangeSink, LogSink, Watcher};
