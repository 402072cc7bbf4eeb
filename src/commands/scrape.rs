//! One-shot scrape: fetch, extract and filter once, then print.

use crate::config::Config;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::filters::FilterChain;
use crate::format::Formatter;
use crate::monitor::Scraper;
use crate::retailers::{stock_probe_for, stock_probe_with_api};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prints what the monitor would currently see, without notifying.
pub struct ScrapeCommand {
    config: Config,
}

impl ScrapeCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Executes the scrape and returns formatted output.
    pub async fn execute(&self) -> Result<String> {
        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        self.execute_with_fetcher(Arc::new(fetcher)).await
    }

    /// Executes the scrape with a provided fetcher (for testing).
    pub async fn execute_with_fetcher(&self, fetcher: Arc<dyn Fetcher>) -> Result<String> {
        let scraper = Scraper::from_config(&self.config, fetcher.clone()).context("Invalid configuration")?;
        let retailer = scraper.retailer();

        info!("Scraping {} ({} source(s))", retailer.display_name(), scraper.sources().len());

        let scrape = scraper
            .scrape()
            .await
            .with_context(|| format!("Failed to scrape {}", retailer.display_name()))?;

        let filters = FilterChain::from_config(&self.config);
        if !filters.is_empty() {
            debug!("Active filters: {}", filters.descriptions().join(", "));
        }

        let found = scrape.records.len();
        let mut records = filters.apply(scrape.records);

        let regions = &self.config.stock_regions;
        let probe = match &self.config.stock_api {
            Some(api) => stock_probe_with_api(retailer, fetcher, regions, api),
            None => stock_probe_for(retailer, fetcher, regions),
        };

        if let Some(probe) = probe {
            for record in &mut records {
                match probe.probe(record).await {
                    Ok(levels) => record.stock = levels,
                    Err(e) => warn!("Stock lookup failed for {}: {}", record.id, e),
                }
            }
        }

        info!(
            "Found {} products over {} page(s), {} skipped, {} matching criteria",
            found,
            scrape.pages,
            scrape.skipped,
            records.len()
        );

        let formatter = Formatter::new(self.config.format, retailer);
        Ok(formatter.format_products(&records))
    }
}
