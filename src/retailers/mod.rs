//! Retailer-specific extraction of product lists from fetched pages.

pub mod amazon;
pub mod bigw;
pub mod ebgames;
pub mod kmart;
pub mod retailer;
pub mod selectors;
pub mod shopify;
pub mod states;
pub mod target;

pub use amazon::AmazonExtractor;
pub use bigw::BigWExtractor;
pub use ebgames::EbGamesExtractor;
pub use kmart::{KmartExtractor, KmartStockProbe};
pub use retailer::{Retailer, RetailerParseError};
pub use shopify::ShopifyExtractor;
pub use states::{AuState, StateParseError};
pub use target::{TargetExtractor, TargetStockProbe};

use crate::error::{ExtractError, FetchError};
use crate::fetch::Fetcher;
use crate::models::{ProductRecord, StockLevels};
use async_trait::async_trait;
use regex_lite::Regex;
use std::sync::{Arc, LazyLock};

/// Products found on one page.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Well-formed records in page order
    pub records: Vec<ProductRecord>,
    /// Items dropped for lacking an identifier or title
    pub skipped: usize,
    /// Whether the page advertises a following page
    pub has_more: bool,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Turns a raw page body into product records for one retailer.
pub trait Extractor: Send + Sync {
    fn retailer(&self) -> Retailer;

    /// URL of page `page` (1-based) of a listing, or `None` if the retailer
    /// does not paginate that way.
    fn page_url(&self, base: &str, page: u32) -> Option<String> {
        (page <= 1).then(|| base.to_string())
    }

    /// Search URL for a free-text term, if the retailer supports term search.
    fn search_url(&self, _term: &str) -> Option<String> {
        None
    }

    /// Parses the page. A page without the expected structure is an error;
    /// individual malformed items are skipped and counted.
    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError>;
}

/// Looks up per-location stock for one record.
#[async_trait]
pub trait StockProbe: Send + Sync {
    async fn probe(&self, record: &ProductRecord) -> Result<StockLevels, FetchError>;
}

/// Builds the extractor for `retailer`. `base_url` is the monitored page and
/// is needed by storefronts that build product links from it.
pub fn extractor_for(retailer: Retailer, base_url: &str) -> Box<dyn Extractor> {
    match retailer {
        Retailer::Amazon => Box::new(AmazonExtractor::new()),
        Retailer::BigW => Box::new(BigWExtractor::new()),
        Retailer::EbGames => Box::new(EbGamesExtractor::new()),
        Retailer::Kmart => Box::new(KmartExtractor::new()),
        Retailer::Target => Box::new(TargetExtractor::new()),
        Retailer::Shopify => Box::new(ShopifyExtractor::new(base_url)),
    }
}

/// Builds the regional stock probe for retailers that expose one.
pub fn stock_probe_for(
    retailer: Retailer,
    fetcher: Arc<dyn Fetcher>,
    states: &[AuState],
) -> Option<Arc<dyn StockProbe>> {
    if states.is_empty() {
        return None;
    }

    match retailer {
        Retailer::Kmart => Some(Arc::new(KmartStockProbe::new(fetcher, states.to_vec()))),
        Retailer::Target => Some(Arc::new(TargetStockProbe::new(fetcher, states.to_vec()))),
        _ => None,
    }
}

/// Like [`stock_probe_for`] but against a custom API base URL.
pub fn stock_probe_with_api(
    retailer: Retailer,
    fetcher: Arc<dyn Fetcher>,
    states: &[AuState],
    api_base: &str,
) -> Option<Arc<dyn StockProbe>> {
    if states.is_empty() {
        return None;
    }

    match retailer {
        Retailer::Kmart => Some(Arc::new(KmartStockProbe::with_api_base(fetcher, states.to_vec(), api_base))),
        Retailer::Target => Some(Arc::new(TargetStockProbe::with_api_base(fetcher, states.to_vec(), api_base))),
        _ => None,
    }
}

static PAGE_PARAM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([?&])page=\d+").unwrap());

/// Sets the `page` query parameter, replacing an existing one.
pub(crate) fn with_page_param(url: &str, page: u32) -> String {
    if PAGE_PARAM.is_match(url) {
        return PAGE_PARAM.replace(url, format!("${{1}}page={}", page)).into_owned();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", url, separator, page)
}

/// Resolves a possibly relative link against a storefront origin.
pub(crate) fn absolute_url(origin: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') {
        format!("{}{}", origin.trim_end_matches('/'), href)
    } else {
        format!("{}/{}", origin.trim_end_matches('/'), href)
    }
}

/// Collapses runs of whitespace into single spaces.
pub(crate) fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
