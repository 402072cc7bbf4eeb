//! EB Games search page extraction.

use super::selectors::ebgames as sel;
use super::{absolute_url, squash_whitespace, Extraction, Extractor, Retailer};
use crate::error::ExtractError;
use crate::models::{Availability, ProductRecord};
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, trace};

const ORIGIN: &str = "https://www.ebgames.com.au";

/// Titles shorter than this are badges or labels, not product names.
const MIN_TITLE_LEN: usize = 10;

static ID_IN_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)-").unwrap());
static PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$?(\d+\.?\d*)").unwrap());

static LEADING_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$[\d.]+\s*(\([^)]+\))?\s*").unwrap());
static PREORDER_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*PREORDER.*$").unwrap());
static DELIVERY_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*Delivery\s*Collect\s*$").unwrap());
static TRADING_CARDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*Trading Cards\s*").unwrap());

/// Extracts product tiles from EB Games search pages.
#[derive(Debug, Default)]
pub struct EbGamesExtractor;

impl EbGamesExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse_card(&self, card: ElementRef) -> Option<ProductRecord> {
        let raw_title = sel::TITLES.iter().find_map(|selector| {
            card.select(selector)
                .next()
                .map(|e| e.text().collect::<String>().trim().to_string())
                .filter(|text| text.chars().count() > MIN_TITLE_LEN)
        })?;

        let url = card
            .select(&sel::LINK)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(|href| absolute_url(ORIGIN, href))?;

        let id = card
            .value()
            .attr("data-product-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| ID_IN_URL.captures(&url).map(|caps| caps[1].to_string()))?;

        let title = clean_title(&raw_title);
        if title.is_empty() {
            return None;
        }

        let mut record = ProductRecord::new(id, title, url);

        record.price = sel::PRICES.iter().find_map(|selector| {
            let text = card.select(selector).next()?.text().collect::<String>();
            PRICE.captures(text.trim()).map(|caps| format!("${}", &caps[1]))
        });

        record.availability = self.parse_status(card);

        record.image_url = card.select(&sel::IMAGE).next().and_then(|img| {
            img.value()
                .attr("src")
                .filter(|src| !src.is_empty())
                .or_else(|| img.value().attr("data-src"))
                .map(|src| absolute_url(ORIGIN, src))
        });

        Some(record)
    }

    /// Reads the first status element that states preorder, sold out or add to cart.
    fn parse_status(&self, card: ElementRef) -> Availability {
        for selector in sel::STOCK.iter() {
            let Some(element) = card.select(selector).next() else {
                continue;
            };

            let text = element.text().collect::<String>().to_lowercase();
            if text.contains("preorder") || text.contains("pre-order") {
                return Availability::PreOrder;
            } else if text.contains("out of stock") {
                return Availability::OutOfStock;
            } else if text.contains("add to cart") {
                return Availability::InStock;
            }
        }

        Availability::Unknown
    }
}

/// Strips the leading price, preorder and delivery suffixes and the
/// "Trading Cards" category label from a tile title.
pub fn clean_title(title: &str) -> String {
    let title = LEADING_PRICE.replace(title, "");
    let title = PREORDER_SUFFIX.replace(&title, "");
    let title = DELIVERY_SUFFIX.replace(&title, "");
    let title = TRADING_CARDS.replace_all(&title, " ");
    squash_whitespace(&title)
}

impl Extractor for EbGamesExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::EbGames
    }

    fn search_url(&self, term: &str) -> Option<String> {
        Some(format!("{}/search?q={}", ORIGIN, urlencoding::encode(term)))
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(raw);

        let cards: Vec<ElementRef> = sel::CARDS
            .iter()
            .map(|selector| document.select(selector).collect::<Vec<_>>())
            .find(|cards| !cards.is_empty())
            .unwrap_or_default();

        if cards.is_empty() && document.select(&sel::LISTING).next().is_none() {
            return Err(ExtractError::MissingStructure("product tiles".to_string()));
        }

        let mut extraction = Extraction::default();

        for card in cards {
            match self.parse_card(card) {
                Some(record) => {
                    trace!("Parsed product: {} - {}", record.id, record.title);
                    extraction.records.push(record);
                }
                None => extraction.skipped += 1,
            }
        }

        debug!(
            "Parsed {} EB Games products ({} skipped)",
            extraction.records.len(),
            extraction.skipped
        );

        Ok(extraction)
    }
}
