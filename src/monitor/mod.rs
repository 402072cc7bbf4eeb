//! The polling loop: scrape, filter, diff, notify.
//!
//! One [`Monitor`] owns its tracked set and runs cycles strictly in sequence.
//! Notifications are sent from detached tasks so a slow or failing webhook
//! never delays the next cycle.

mod scraper;
mod stats;

pub use self::scraper::{Scrape, ScrapeFailure, Scraper};
pub use self::stats::{MonitorStats, StatsSnapshot};

use crate::config::Config;
use crate::error::{ConfigError, ExtractError, FetchError};
use crate::fetch::Fetcher;
use crate::filters::FilterChain;
use crate::models::{increased_locations, stocked_locations, ProductRecord, StockLevel, StockLevels};
use crate::notify::{EventKind, Notification, Notifier};
use crate::retailers::{stock_probe_for, stock_probe_with_api, Retailer, StockProbe};
use crate::tracker::{Delta, Observation, Phase, PrimingPolicy, StockIncrease, Tracker};
use rand::Rng;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Result of one scrape cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A page could not be loaded; the tracked set is unchanged.
    FetchFailed(FetchError),
    /// A page loaded but had no recognisable product data; the tracked set is unchanged.
    ExtractFailed(ExtractError),
    /// The scrape succeeded, possibly with zero products.
    Completed(CycleReport),
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Completed(_))
    }
}

/// Counts from a completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records extracted across all pages
    pub scraped: usize,
    /// Items dropped as malformed
    pub skipped: usize,
    /// Records that passed the filters
    pub matched: usize,
    /// This cycle primed the tracker
    pub primed: bool,
    pub new: usize,
    pub restocked: usize,
    pub removed: usize,
    /// Notifications queued for delivery
    pub notifications: usize,
}

pub struct Monitor {
    retailer: Retailer,
    scraper: Scraper,
    probe: Option<Arc<dyn StockProbe>>,
    filters: FilterChain,
    tracker: Tracker<StockLevels>,
    notifier: Arc<dyn Notifier>,
    poll_delay: Duration,
    poll_jitter_ms: u64,
    stats: Arc<MonitorStats>,
    deliveries: JoinSet<()>,
}

impl Monitor {
    /// Creates a monitor with no filters and default pacing.
    pub fn new(scraper: Scraper, notifier: Arc<dyn Notifier>) -> Self {
        let retailer = scraper.retailer();

        Self {
            retailer,
            scraper,
            probe: None,
            filters: FilterChain::new(),
            tracker: Tracker::new(PrimingPolicy::default(), StockIncrease),
            notifier,
            poll_delay: Duration::from_secs(retailer.default_poll_secs()),
            poll_jitter_ms: 0,
            stats: Arc::new(MonitorStats::default()),
            deliveries: JoinSet::new(),
        }
    }

    /// Builds a monitor from validated configuration.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ConfigError> {
        let scraper = Scraper::from_config(config, fetcher.clone())?;

        let probe = match &config.stock_api {
            Some(api) => stock_probe_with_api(config.retailer, fetcher, &config.stock_regions, api),
            None => stock_probe_for(config.retailer, fetcher, &config.stock_regions),
        };

        Ok(Self::new(scraper, notifier)
            .with_filters(FilterChain::from_config(config))
            .with_probe(probe)
            .with_priming(config.priming)
            .with_poll_delay(config.poll_delay(), config.delay_jitter_ms))
    }

    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_probe(mut self, probe: Option<Arc<dyn StockProbe>>) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the tracker; only meaningful before the first cycle.
    pub fn with_priming(mut self, policy: PrimingPolicy) -> Self {
        self.tracker = Tracker::new(policy, StockIncrease);
        self
    }

    pub fn with_poll_delay(mut self, delay: Duration, jitter_ms: u64) -> Self {
        self.poll_delay = delay;
        self.poll_jitter_ms = jitter_ms;
        self
    }

    pub fn retailer(&self) -> Retailer {
        self.retailer
    }

    pub fn sources(&self) -> &[String] {
        self.scraper.sources()
    }

    pub fn tracker(&self) -> &Tracker<StockLevels> {
        &self.tracker
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Notifications still being delivered.
    pub fn pending_deliveries(&self) -> usize {
        self.deliveries.len()
    }

    /// Runs cycles until Ctrl-C, then waits for queued notifications.
    pub async fn run(&mut self) -> StatsSnapshot {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs cycles until `shutdown` resolves. The signal interrupts both a
    /// running cycle and the sleep between cycles.
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> StatsSnapshot {
        tokio::pin!(shutdown);

        info!(
            "Monitoring {} ({} source(s), up to {} page(s), every {:?})",
            self.retailer.display_name(),
            self.scraper.sources().len(),
            self.scraper.max_pages(),
            self.poll_delay
        );
        if !self.filters.is_empty() {
            info!("Filters: {}", self.filters.descriptions().join("; "));
        }

        loop {
            let finished = tokio::select! {
                _ = self.run_cycle() => false,
                _ = &mut shutdown => true,
            };
            if finished {
                break;
            }

            let delay = self.next_delay();
            debug!("Next cycle in {:?}", delay);

            let finished = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = &mut shutdown => true,
            };
            if finished {
                break;
            }
        }

        info!("Shutting down, {} notification(s) pending", self.deliveries.len());
        self.flush_deliveries().await;

        let stats = self.stats.snapshot();
        info!(
            "Ran {} cycle(s) ({} failed), sent {} notification(s) ({} failed)",
            stats.cycles, stats.failed_cycles, stats.notifications_sent, stats.notifications_failed
        );
        stats
    }

    fn next_delay(&self) -> Duration {
        let jitter = if self.poll_jitter_ms > 0 {
            rand::rng().random_range(0..=self.poll_jitter_ms)
        } else {
            0
        };
        self.poll_delay + Duration::from_millis(jitter)
    }

    /// Performs one scrape and queues notifications for what changed.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.reap_deliveries();

        let outcome = self.scrape_and_diff().await;
        self.stats.record_cycle(outcome.is_success());

        match &outcome {
            CycleOutcome::FetchFailed(e) => error!("Fetch failed, keeping previous state: {}", e),
            CycleOutcome::ExtractFailed(e) => warn!("No product data, keeping previous state: {}", e),
            CycleOutcome::Completed(report) => info!(
                "Scraped {} product(s) ({} skipped, {} matched): {} new, {} restocked, {} gone",
                report.scraped, report.skipped, report.matched, report.new, report.restocked, report.removed
            ),
        }

        outcome
    }

    async fn scrape_and_diff(&mut self) -> CycleOutcome {
        let Scrape { records, skipped, .. } = match self.scraper.scrape().await {
            Ok(scrape) => scrape,
            Err(ScrapeFailure::Fetch(e)) => return CycleOutcome::FetchFailed(e),
            Err(ScrapeFailure::Extract(e)) => return CycleOutcome::ExtractFailed(e),
        };

        let scraped = records.len();
        let mut records = self.filters.apply(records);

        if let Some(probe) = self.probe.clone() {
            for record in &mut records {
                match probe.probe(record).await {
                    Ok(levels) => record.stock = levels,
                    Err(e) => {
                        warn!("[STOCK] Lookup failed for {}, keeping last known stock: {}", record.id, e);
                        record.stock = self.tracker.get(&record.id).cloned().unwrap_or_default();
                    }
                }
            }
        }

        let mut report = CycleReport { scraped, skipped, matched: records.len(), ..CycleReport::default() };

        let observation = self
            .tracker
            .observe(records.iter().map(|record| (record.id.clone(), record.stock.clone())));

        let mut by_id: HashMap<&str, &ProductRecord> = HashMap::new();
        for record in &records {
            by_id.entry(record.id.as_str()).or_insert(record);
        }

        match observation {
            Observation::Primed { tracked } => {
                report.primed = true;
                info!("[INITIAL] Tracking {} product(s), no notifications sent", tracked);
            }
            Observation::PrimingDeferred => {
                info!("[INITIAL] Scrape returned no products, waiting for a non-empty one to prime");
            }
            Observation::Steady(deltas) => {
                for delta in deltas {
                    match delta {
                        Delta::New { id } => {
                            let Some(record) = by_id.get(id.as_str()) else { continue };
                            info!("[NEW] {} - {} ({})", record.id, record.title, record.url);
                            report.new += 1;
                            let regional = stocked_locations(&record.stock);
                            if !record.stock.is_empty() && regional.is_empty() {
                                info!("[NEW] {} has no stock in any region, not announced", record.id);
                                continue;
                            }
                            report.notifications += self.announce(EventKind::New, record, regional);
                        }
                        Delta::Changed { id, previous } => {
                            let Some(record) = by_id.get(id.as_str()) else { continue };
                            info!("[RESTOCK] {} - {}", record.id, record.title);
                            report.restocked += 1;
                            let regional = increased_locations(&previous, &record.stock);
                            report.notifications += self.announce(EventKind::Restock, record, regional);
                        }
                        Delta::Removed { id, .. } => {
                            info!("[OOS] {} no longer listed", id);
                            report.removed += 1;
                        }
                    }
                }
            }
        }

        if self.tracker.phase() == Phase::Priming {
            debug!("Still priming after this cycle");
        }

        CycleOutcome::Completed(report)
    }

    /// Queues the main notification plus one per routed location.
    fn announce(
        &mut self,
        kind: EventKind,
        record: &ProductRecord,
        locations: Vec<(String, StockLevel)>,
    ) -> usize {
        let mut queued = 1;
        self.dispatch(Notification::new(self.retailer, kind, record.clone()));

        for (location, level) in locations {
            if self.notifier.routes_location(&location) {
                debug!("{} {} stock in {}: {}", kind.tag(), record.id, location, level.summary());
                self.dispatch(Notification::for_location(self.retailer, kind, record.clone(), location, level));
                queued += 1;
            }
        }

        queued
    }

    fn dispatch(&mut self, notification: Notification) {
        let notifier = self.notifier.clone();
        let stats = self.stats.clone();

        self.deliveries.spawn(async move {
            match notifier.notify(&notification).await {
                Ok(()) => stats.record_delivery(true),
                Err(e) => {
                    error!("Failed to send notification for {}: {}", notification.record.id, e);
                    stats.record_delivery(false);
                }
            }
        });
    }

    fn reap_deliveries(&mut self) {
        while let Some(result) = self.deliveries.try_join_next() {
            if let Err(e) = result {
                error!("Notification task failed: {}", e);
            }
        }
    }

    /// Waits for every queued notification to finish.
    pub async fn flush_deliveries(&mut self) {
        while let Some(result) = self.deliveries.join_next().await {
            if let Err(e) = result {
                error!("Notification task failed: {}", e);
            }
        }
    }
}
