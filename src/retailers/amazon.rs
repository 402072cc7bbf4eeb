//! Amazon AU search result extraction.

use super::selectors::amazon as sel;
use super::{absolute_url, squash_whitespace, with_page_param, Extraction, Extractor, Retailer};
use crate::error::ExtractError;
use crate::models::{Availability, ProductRecord, Rating};
use scraper::{ElementRef, Html};
use tracing::{debug, trace};

const ORIGIN: &str = "https://www.amazon.com.au";

/// Extracts product cards from Amazon AU search pages.
pub struct AmazonExtractor {
    origin: String,
}

impl AmazonExtractor {
    pub fn new() -> Self {
        Self { origin: ORIGIN.to_string() }
    }

    /// Checks for CAPTCHA or the 503 error page.
    fn check_for_errors(&self, document: &Html) -> Result<(), ExtractError> {
        if document.select(&sel::CAPTCHA).next().is_some() {
            return Err(ExtractError::Blocked(
                "CAPTCHA detected. Try using a proxy or increasing the poll delay.".to_string(),
            ));
        }

        if document.select(&sel::DOG_PAGE).next().is_some() {
            return Err(ExtractError::Blocked("Amazon error page (503)".to_string()));
        }

        Ok(())
    }

    /// Parses a single result card. Returns `None` when the ASIN or title is missing.
    fn parse_card(&self, element: ElementRef) -> Option<ProductRecord> {
        let asin = element.value().attr(sel::ASIN_ATTR).map(str::trim).filter(|a| !a.is_empty())?;

        let title = element
            .select(&sel::TITLE)
            .next()
            .map(|e| squash_whitespace(&e.text().collect::<String>()))
            .filter(|t| !t.is_empty())?;

        let url = element
            .select(&sel::TITLE_LINK)
            .next()
            .and_then(|e| e.value().attr("href"))
            .map(|href| absolute_url(&self.origin, href))
            .unwrap_or_else(|| format!("{}/dp/{}", self.origin, asin));

        let mut record = ProductRecord::new(asin, title, url);

        record.image_url =
            element.select(&sel::IMAGE).next().and_then(|e| e.value().attr("src").map(String::from));

        record.price = element
            .select(&sel::PRICE)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .filter(|p| !p.is_empty());

        record.rating = self.parse_rating(element);
        record.member_eligible = element.select(&sel::PRIME_BADGE).next().is_some();

        record.brand = element
            .select(&sel::BRAND)
            .next()
            .map(|e| e.text().collect::<String>().trim().trim_start_matches("by ").to_string())
            .filter(|b| !b.is_empty());

        record.availability = self.parse_availability(element, record.price.is_some());

        Some(record)
    }

    fn parse_availability(&self, element: ElementRef, has_price: bool) -> Availability {
        let unavailable = element.select(&sel::AVAILABILITY_TEXT).any(|e| {
            let text = e.text().collect::<String>().to_lowercase();
            text.contains("out of stock") || text.contains("unavailable")
        });

        if unavailable {
            Availability::OutOfStock
        } else if has_price {
            Availability::InStock
        } else {
            Availability::Unknown
        }
    }

    /// Parses "4.5 out of 5 stars" plus a review count like "1,234".
    fn parse_rating(&self, element: ElementRef) -> Option<Rating> {
        let stars_text =
            element.select(&sel::RATING_STARS).next().map(|e| e.text().collect::<String>())?;
        let stars: f32 = stars_text.split_whitespace().next()?.replace(',', ".").parse().ok()?;

        let review_count = element
            .select(&sel::RATING_COUNT)
            .next()
            .map(|e| e.text().collect::<String>())
            .map(|text| text.chars().filter(|c| c.is_ascii_digit()).collect::<String>())
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0);

        Some(Rating::new(stars, review_count))
    }
}

impl Default for AmazonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for AmazonExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::Amazon
    }

    fn page_url(&self, base: &str, page: u32) -> Option<String> {
        if page <= 1 {
            return Some(base.to_string());
        }
        Some(with_page_param(base, page))
    }

    fn search_url(&self, term: &str) -> Option<String> {
        Some(format!("{}/s?k={}", self.origin, urlencoding::encode(term)))
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(raw);
        self.check_for_errors(&document)?;

        let mut extraction = Extraction::default();
        let mut cards = 0;

        for element in document.select(&sel::RESULT) {
            cards += 1;
            match self.parse_card(element) {
                Some(record) => {
                    trace!("Parsed product: {} - {}", record.id, record.title);
                    extraction.records.push(record);
                }
                None => extraction.skipped += 1,
            }
        }

        if cards == 0 && document.select(&sel::RESULTS_CONTAINER).next().is_none() {
            return Err(ExtractError::MissingStructure("search result list".to_string()));
        }

        extraction.has_more = document.select(&sel::NEXT_PAGE).next().is_some();

        debug!(
            "Parsed {} Amazon products ({} skipped, has_more: {})",
            extraction.records.len(),
            extraction.skipped,
            extraction.has_more
        );

        Ok(extraction)
    }
}
