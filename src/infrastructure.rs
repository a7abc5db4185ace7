//! Infrastructure layer for configuration, fetching, caching and parsing
//!
//! This module provides the rate-limited HTTP client, the JSON snapshot
//! cache, configuration and logging plumbing, and the HTML parsing
//! subsystem for the two school document kinds.

pub mod cache;
pub mod config;
pub mod http_client;
pub mod logging;
pub mod parsing;

// Re-export commonly used items
pub use cache::{CacheError, Refreshed, SnapshotCache};
pub use config::{AppConfig, ConfigManager, FetchConfig, LoggingConfig, SchoolConfig, WatchConfig};
pub use http_client::{FetchError, HttpClient};
pub use logging::{init_logging, init_logging_with_config};
pub use parsing::{
    DocumentParser, ParseError, ParseResult, PostContext, SubstitutionsParser, TimetableContext,
    TimetableParser,
};
