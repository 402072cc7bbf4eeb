//! Fetches and extracts every page of every monitored source.

use crate::config::Config;
use crate::error::{ConfigError, ExtractError, FetchError};
use crate::fetch::Fetcher;
use crate::models::ProductRecord;
use crate::retailers::{extractor_for, Extractor, Retailer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Records collected by one scrape, in page order.
#[derive(Debug, Clone, Default)]
pub struct Scrape {
    pub records: Vec<ProductRecord>,
    /// Malformed items dropped across all pages
    pub skipped: usize,
    /// Pages loaded
    pub pages: usize,
}

/// Why a scrape produced nothing usable.
#[derive(Debug, Error)]
pub enum ScrapeFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),
}

pub struct Scraper {
    fetcher: Arc<dyn Fetcher>,
    extractor: Box<dyn Extractor>,
    sources: Vec<String>,
    max_pages: u32,
}

impl Scraper {
    pub fn new(extractor: Box<dyn Extractor>, sources: Vec<String>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher, extractor, sources, max_pages: 1 }
    }

    /// Builds the scraper for the configured retailer. Search terms become
    /// one source each; without them the configured page is the only source.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> Result<Self, ConfigError> {
        config.validate_sources()?;

        let base = config.page_url().unwrap_or_else(|_| config.retailer.base_url().to_string());
        let extractor = extractor_for(config.retailer, &base);

        let mut sources = Vec::new();
        for term in &config.search_terms {
            match extractor.search_url(term) {
                Some(url) => sources.push(url),
                None => warn!("{} has no term search; ignoring \"{}\"", config.retailer.display_name(), term),
            }
        }
        if sources.is_empty() {
            sources.push(config.page_url()?);
        }

        Ok(Self::new(extractor, sources, fetcher).with_max_pages(config.max_pages))
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn retailer(&self) -> Retailer {
        self.extractor.retailer()
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Loads pages in order. Each source stops at `max_pages`, an empty page,
    /// or a page that reports no successor. Any failed page fails the scrape
    /// so a partial listing is never mistaken for removals.
    pub async fn scrape(&self) -> Result<Scrape, ScrapeFailure> {
        let mut scrape = Scrape::default();

        for source in &self.sources {
            for page in 1..=self.max_pages {
                let Some(url) = self.extractor.page_url(source, page) else {
                    break;
                };

                let body = self.fetcher.fetch(&url).await?;
                let extraction = self.extractor.extract(&body)?;
                scrape.pages += 1;

                debug!("Page {} of {}: {} product(s)", page, source, extraction.records.len());
                scrape.skipped += extraction.skipped;

                if extraction.is_empty() {
                    break;
                }

                let has_more = extraction.has_more;
                scrape.records.extend(extraction.records);

                if !has_more {
                    break;
                }
            }
        }

        Ok(scrape)
    }
}
