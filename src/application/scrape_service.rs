//! High-level scraping service coordinating fetch, parse and cache.
//!
//! One service instance owns the HTTP client, the snapshot cache and the
//! in-memory per-class timetable map that backs the substitutions parser's
//! lookup. The watch loop drives it sequentially, so one scrape-and-store
//! cycle always completes before the next begins.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use scraper::Html;
use tracing::{debug, info};

use crate::domain::timetable::Timetable;
use crate::domain::SubstitutionsPost;
use crate::infrastructure::cache::{Refreshed, SnapshotCache};
use crate::infrastructure::config::{AppConfig, ConfigManager};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::{
    DocumentParser, PostContext, SubstitutionsParser, TimetableContext, TimetableParser,
};

/// Cache key of the substitutions bulletin snapshot.
const SUBSTITUTIONS_KEY: &str = "substitutions";

fn timetable_key(class: &str) -> String {
    format!("timetable-{class}")
}

/// Service running fetch-parse-cache cycles for both document kinds.
pub struct ScrapeService {
    config: AppConfig,
    client: HttpClient,
    cache: SnapshotCache,
    timetable_parser: TimetableParser,
    /// Parsed timetables by class code, backing the substitutions lookup.
    timetables: HashMap<String, Timetable>,
}

impl ScrapeService {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = HttpClient::new(&config.fetch).context("Failed to create HTTP client")?;

        let cache_dir = match &config.watch.cache_dir {
            Some(dir) => dir.clone(),
            None => ConfigManager::get_app_data_dir()?.join("cache"),
        };
        let max_age = Duration::from_secs(config.watch.interval_minutes * 60);
        let cache = SnapshotCache::new(cache_dir, max_age);

        let timetable_parser =
            TimetableParser::new().context("Failed to create timetable parser")?;

        Ok(Self {
            config,
            client,
            cache,
            timetable_parser,
            timetables: HashMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Parsed timetables by class code, as refreshed so far.
    pub fn timetables(&self) -> &HashMap<String, Timetable> {
        &self.timetables
    }

    /// Seed the lookup map from cached snapshots without touching the
    /// network. Substitution lines can then cross-reference timetables
    /// right after startup.
    pub async fn hydrate(&mut self) {
        for class in self.config.school.classes.keys() {
            if let Some(table) = self.cache.peek::<Timetable>(&timetable_key(class)).await {
                self.timetables.insert(class.clone(), table);
            }
        }
        if !self.timetables.is_empty() {
            debug!("Hydrated {} timetables from cached snapshots", self.timetables.len());
        }
    }

    /// Refresh one class timetable and record it in the lookup map.
    pub async fn refresh_timetable(
        &mut self,
        class: &str,
        force: bool,
    ) -> Result<Refreshed<Timetable>> {
        let url = self
            .config
            .school
            .timetable_url(class)
            .with_context(|| format!("Class '{class}' is not configured in school.classes"))?;

        let client = &self.client;
        let parser = &self.timetable_parser;
        let context = TimetableContext::new(class);
        let refreshed = self
            .cache
            .get_or_refresh(&timetable_key(class), force, || async move {
                let body = client.get_text(&url).await?;
                let html = Html::parse_document(&body);
                Ok(parser.parse_with_context(&html, &context)?)
            })
            .await?;

        self.timetables
            .insert(class.to_string(), refreshed.current.clone());

        if refreshed.refreshed {
            info!("Refreshed timetable for class {}", class);
        }
        Ok(refreshed)
    }

    /// Refresh every configured class, skipping over per-class failures.
    pub async fn refresh_all_timetables(
        &mut self,
        force: bool,
    ) -> Vec<(String, Result<Refreshed<Timetable>>)> {
        let classes: Vec<String> = self.config.school.classes.keys().cloned().collect();
        let mut results = Vec::with_capacity(classes.len());
        for class in classes {
            let result = self.refresh_timetable(&class, force).await;
            results.push((class, result));
        }
        results
    }

    /// Refresh the substitutions bulletin.
    ///
    /// `strict` propagates document-shape mismatches instead of embedding
    /// them into the result.
    pub async fn refresh_substitutions(
        &self,
        force: bool,
        strict: bool,
    ) -> Result<Refreshed<SubstitutionsPost>> {
        let parser = SubstitutionsParser::with_selectors(
            &self.config.school.post_container_selectors,
            &self.timetables,
        )
        .context("Failed to create substitutions parser")?;

        let url = self.config.school.substitutions_url.clone();
        let client = &self.client;
        let refreshed = self
            .cache
            .get_or_refresh(SUBSTITUTIONS_KEY, force, || async move {
                let body = client.get_text(&url).await?;
                let html = Html::parse_document(&body);
                let context = PostContext::new(&url);
                if strict {
                    Ok(parser.try_parse_post(&html, &context)?)
                } else {
                    Ok(parser.parse_post(&html, &context))
                }
            })
            .await?;

        if refreshed.refreshed {
            info!(
                "Refreshed substitutions bulletin (dated {:?})",
                refreshed.current.date
            );
        }
        Ok(refreshed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.watch.cache_dir = Some(dir.path().to_path_buf());
        config
    }

    #[tokio::test]
    async fn unconfigured_class_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = ScrapeService::new(test_config(&dir)).unwrap();

        let err = service.refresh_timetable("9z", false).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn hydrate_reads_cached_timetables() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(&dir);
        config
            .school
            .classes
            .insert("2d".to_string(), "o12.html".to_string());

        let cache = SnapshotCache::new(dir.path().to_path_buf(), Duration::from_secs(600));
        cache
            .get_or_refresh("timetable-2d", true, || async { Ok(Timetable::default()) })
            .await
            .unwrap();

        let mut service = ScrapeService::new(config).unwrap();
        service.hydrate().await;
        assert!(service.timetables().contains_key("2d"));
    }
}
