//! Snapshot cache for parsed documents.
//!
//! One pretty-printed JSON file per cache key, each wrapping the parsed
//! value in an envelope with its fetch timestamp. `get_or_refresh` serves
//! the stored snapshot while it is fresh; a refresh persists the new value
//! and hands back the previous one so the caller can diff them.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("snapshot I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot serialization failure: {0}")]
    Serde(#[from] serde_json::Error),

    /// The fetch-and-parse closure failed; nothing was persisted.
    #[error(transparent)]
    Refresh(#[from] anyhow::Error),
}

/// Result of one `get_or_refresh` cycle.
#[derive(Debug)]
pub struct Refreshed<T> {
    /// The value now stored under the key.
    pub current: T,

    /// The previously stored value, present only when a refresh ran.
    pub previous: Option<T>,

    /// Whether the fetch-parse closure ran or the snapshot was served.
    pub refreshed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    fetched_at: DateTime<Utc>,
    value: T,
}

/// Directory-backed store of JSON snapshots.
pub struct SnapshotCache {
    dir: PathBuf,
    max_age: Duration,
}

impl SnapshotCache {
    pub fn new(dir: PathBuf, max_age: Duration) -> Self {
        Self { dir, max_age }
    }

    /// Serve the stored snapshot when it is fresh and `force` is off;
    /// otherwise run `fetch_parse`, persist its value and return it next to
    /// the previously stored one.
    pub async fn get_or_refresh<T, F, Fut>(
        &self,
        key: &str,
        force: bool,
        fetch_parse: F,
    ) -> Result<Refreshed<T>, CacheError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.load_envelope::<T>(key).await {
            Some(envelope) if !force && self.is_fresh(envelope.fetched_at) => {
                debug!("Serving fresh snapshot for '{}'", key);
                Ok(Refreshed {
                    current: envelope.value,
                    previous: None,
                    refreshed: false,
                })
            }
            stored => {
                let value = fetch_parse().await?;
                self.persist(key, &value).await?;
                Ok(Refreshed {
                    current: value,
                    previous: stored.map(|envelope| envelope.value),
                    refreshed: true,
                })
            }
        }
    }

    /// Read the stored snapshot without refreshing, no matter its age.
    pub async fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.load_envelope(key).await.map(|envelope| envelope.value)
    }

    /// An unreadable or corrupt snapshot degrades to a cache miss.
    async fn load_envelope<T: DeserializeOwned>(&self, key: &str) -> Option<Envelope<T>> {
        let path = self.snapshot_path(key);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read snapshot {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(envelope) => Some(envelope),
            Err(e) => {
                warn!("Corrupt snapshot {:?}, refetching: {}", path, e);
                None
            }
        }
    }

    async fn persist<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;
        let envelope = Envelope {
            fetched_at: Utc::now(),
            value,
        };
        let content = serde_json::to_string_pretty(&envelope)?;
        fs::write(self.snapshot_path(key), content).await?;
        Ok(())
    }

    fn snapshot_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        match Utc::now().signed_duration_since(fetched_at).to_std() {
            Ok(age) => age < self.max_age,
            // Timestamp in the future: clock moved, treat as fresh
            Err(_) => true,
        }
    }
}
