use crate::{
    error::WatchError,
    services::{Analytics, BatchOutcome, PageQuery, SellWatcher, TransactionSource},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: Duration,
    pub page_limit: u32,
    pub type_filter: Option<String>,
}

/// Pull-mode driver: fetches the newest page of the wallet's transactions on
/// a fixed interval and feeds it to the watcher.
pub struct Poller {
    watcher: Arc<SellWatcher>,
    source: Arc<dyn TransactionSource>,
    analytics: Arc<Analytics>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(
        watcher: Arc<SellWatcher>,
        source: Arc<dyn TransactionSource>,
        analytics: Arc<Analytics>,
        settings: PollSettings,
    ) -> Self {
        Self {
            watcher,
            source,
            analytics,
            settings,
        }
    }

    fn wallet(&self) -> &str {
        self.watcher.detector().wallet()
    }

    fn page_query(&self, before: Option<String>) -> PageQuery {
        PageQuery {
            before,
            limit: Some(self.settings.page_limit),
            type_filter: self.settings.type_filter.clone(),
        }
    }

    /// One poll cycle. A source failure is returned as `SourceUnavailable`
    /// without touching the store.
    pub async fn tick(&self) -> Result<BatchOutcome, WatchError> {
        tracing::debug!("Polling for new transactions...");

        let records = match self.source.fetch_page(self.wallet(), &self.page_query(None)).await {
            Ok(records) => {
                self.analytics.record_poll(true);
                records
            }
            Err(e) => {
                self.analytics.record_poll(false);
                return Err(e);
            }
        };

        let mut outcome = self.watcher.process(&records).await;
        if let Some(e) = outcome.fatal.take() {
            return Err(e.into());
        }
        Ok(outcome)
    }

    /// Runs ticks until a fatal error. The first tick fires immediately; a
    /// tick that overruns the interval delays the next one instead of
    /// stacking a backlog.
    pub async fn run(&self) -> Result<(), WatchError> {
        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "Polling every {}s (page limit {})",
            self.settings.interval.as_secs(),
            self.settings.page_limit
        );

        loop {
            ticker.tick().await;

            match self.tick().await {
                Ok(outcome) if outcome.detected > 0 => tracing::info!(
                    "Poll complete: {} sells, {} alerted, {} failed",
                    outcome.detected,
                    outcome.notified,
                    outcome.failed
                ),
                Ok(_) => tracing::debug!("Poll complete: no new sells"),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("Poll cycle skipped: {}", e),
            }
        }
    }

    /// Walks the wallet's history backwards and marks every past sell as
    /// seen. Stops at an empty page, a source error, or `max_pages`.
    pub async fn preload(&self, max_pages: u32) -> usize {
        let mut before: Option<String> = None;
        let mut marked = 0;
        let mut pages = 0;

        while pages < max_pages {
            let query = self.page_query(before.clone());
            let records = match self.source.fetch_page(self.wallet(), &query).await {
                Ok(records) if !records.is_empty() => records,
                Ok(_) => break,
                Err(e) => {
                    tracing::info!("History scan ended after {} pages: {}", pages, e);
                    break;
                }
            };

            pages += 1;
            marked += self.watcher.detector().mark_history(&records).await;
            before = records.last().map(|r| r.signature.clone());
        }

        tracing::info!(
            "History preload scanned {} pages, marked {} mints seen",
            pages,
            marked
        );
        marked
    }
}
