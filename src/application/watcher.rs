//! Periodic re-check loop with change detection.
//!
//! Each tick force-refreshes every configured timetable and the bulletin,
//! compares the new snapshots against the previous ones and pushes change
//! events through the sink. Degraded parses are reported once per distinct
//! error payload so a broken page does not alarm on every tick.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::scrape_service::ScrapeService;
use crate::domain::ShapeError;
use crate::infrastructure::cache::Refreshed;

/// A detected difference between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    TimetableChanged { class: String },
    SubstitutionsChanged { date: Option<NaiveDate> },
}

/// Receiver of watch-loop findings.
///
/// The binary ships a logging sink; a chat announcer plugs in here.
#[async_trait]
pub trait ChangeSink: Send + Sync {
    async fn change_detected(&self, event: ChangeEvent);

    /// A bulletin parse finished degraded. Called once per distinct error
    /// payload.
    async fn parse_degraded(&self, source: &str, error: &ShapeError);
}

/// Sink that reports findings through the tracing log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ChangeSink for LogSink {
    async fn change_detected(&self, event: ChangeEvent) {
        match event {
            ChangeEvent::TimetableChanged { class } => {
                info!("Timetable changed for class {}", class);
            }
            ChangeEvent::SubstitutionsChanged { date } => {
                info!("Substitutions bulletin changed (dated {:?})", date);
            }
        }
    }

    async fn parse_degraded(&self, source: &str, error: &ShapeError) {
        warn!(
            "Parse of {} degraded: [{}] {}",
            source, error.kind, error.message
        );
    }
}

/// Dedup filter for degradation reports, keyed by error content.
#[derive(Debug, Default)]
struct DegradationTracker {
    seen: HashSet<u64>,
}

impl DegradationTracker {
    fn first_sighting(&mut self, error: &ShapeError) -> bool {
        let mut hasher = DefaultHasher::new();
        error.kind.hash(&mut hasher);
        error.message.hash(&mut hasher);
        self.seen.insert(hasher.finish())
    }
}

/// Snapshot comparison is JSON-value equality, the same shape the cache
/// persists.
fn values_differ<T: Serialize>(current: &T, previous: &T) -> bool {
    serde_json::to_value(current).ok() != serde_json::to_value(previous).ok()
}

/// A change needs a refresh that actually ran and a previous snapshot to
/// differ from; the very first scrape announces nothing.
fn changed<T: Serialize>(refreshed: &Refreshed<T>) -> bool {
    refreshed.refreshed
        && refreshed
            .previous
            .as_ref()
            .is_some_and(|previous| values_differ(&refreshed.current, previous))
}

/// The periodic watch loop over one scrape service.
pub struct Watcher<S: ChangeSink> {
    service: ScrapeService,
    sink: S,
    interval: Duration,
    degradations: DegradationTracker,
}

impl<S: ChangeSink> Watcher<S> {
    pub fn new(service: ScrapeService, sink: S) -> Self {
        let interval = Duration::from_secs(service.config().watch.interval_minutes * 60);
        Self {
            service,
            sink,
            interval,
            degradations: DegradationTracker::default(),
        }
    }

    /// Run until the token is cancelled. The first tick fires immediately.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        self.service.hydrate().await;

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                _ = shutdown.cancelled() => {
                    info!("Watch loop shutting down");
                    return Ok(());
                }
            }
        }
    }

    /// One re-check cycle. Failures are logged and the loop moves on; the
    /// next tick is the retry.
    async fn tick(&mut self) {
        debug!(
            "Watch tick: re-checking {} timetables and the bulletin",
            self.service.config().school.classes.len()
        );

        for (class, result) in self.service.refresh_all_timetables(true).await {
            match result {
                Ok(refreshed) if changed(&refreshed) => {
                    self.sink
                        .change_detected(ChangeEvent::TimetableChanged { class })
                        .await;
                }
                Ok(_) => {}
                Err(e) => warn!("Timetable refresh for {} failed: {:#}", class, e),
            }
        }

        match self.service.refresh_substitutions(true, false).await {
            Ok(refreshed) => {
                if let Some(error) = &refreshed.current.error {
                    if self.degradations.first_sighting(error) {
                        self.sink
                            .parse_degraded(&self.service.config().school.substitutions_url, error)
                            .await;
                    }
                }
                if changed(&refreshed) {
                    self.sink
                        .change_detected(ChangeEvent::SubstitutionsChanged {
                            date: refreshed.current.date,
                        })
                        .await;
                }
            }
            Err(e) => warn!("Substitutions refresh failed: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::timetable::{Group, Lesson, Timetable, Weekday};

    #[test]
    fn each_distinct_degradation_is_reported_once() {
        let mut tracker = DegradationTracker::default();
        let first = ShapeError::new("unexpected-node", "unsupported <div>");
        let second = ShapeError::new("missing-container", "no post container");

        assert!(tracker.first_sighting(&first));
        assert!(!tracker.first_sighting(&first));
        assert!(tracker.first_sighting(&second));
        assert!(!tracker.first_sighting(&second));
    }

    #[test]
    fn change_detection_compares_json_values() {
        let mut before = Timetable::default();
        before.periods = vec![1];
        let mut after = before.clone();

        assert!(!changed(&Refreshed {
            current: after.clone(),
            previous: Some(before.clone()),
            refreshed: true,
        }));

        after.weekdays.insert(
            Weekday::Monday,
            vec![vec![Lesson::new("matematyka", Group::WholeClass, "204")]],
        );
        assert!(changed(&Refreshed {
            current: after.clone(),
            previous: Some(before),
            refreshed: true,
        }));

        // first-ever scrape has nothing to diff against
        assert!(!changed(&Refreshed {
            current: after,
            previous: None,
            refreshed: true,
        }));
    }
}
