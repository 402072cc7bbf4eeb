//! Kmart category extraction from JSON-LD and per-state stock lookup.

use super::selectors::kmart as sel;
use super::{absolute_url, with_page_param, AuState, Extraction, Extractor, Retailer, StockProbe};
use crate::error::{ExtractError, FetchError};
use crate::fetch::Fetcher;
use crate::models::{Availability, ProductRecord, StockLevel, StockLevels};
use async_trait::async_trait;
use scraper::Html;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};

const ORIGIN: &str = "https://www.kmart.com.au";

/// Product availability endpoint queried per article and state.
pub const AVAILABILITY_API: &str = "https://api.kmart.com.au/gateway/graphql";

/// Extracts products from the JSON-LD blocks of Kmart listing pages.
#[derive(Debug, Default)]
pub struct KmartExtractor;

impl KmartExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Collects product objects from one JSON-LD document.
    /// Returns false when the document holds neither an `ItemList` nor a `Product`.
    fn collect_products<'a>(&self, node: &'a Value, out: &mut Vec<&'a Value>) -> bool {
        if let Some(items) = node.as_array() {
            let mut found = false;
            for item in items {
                found |= self.collect_products(item, out);
            }
            return found;
        }

        if let Some(graph) = node.get("@graph") {
            return self.collect_products(graph, out);
        }

        match node.get("@type").and_then(Value::as_str) {
            Some("ItemList") => {
                let elements = node.get("itemListElement").and_then(Value::as_array);
                for element in elements.into_iter().flatten() {
                    out.push(element.get("item").unwrap_or(element));
                }
                true
            }
            Some("Product") => {
                out.push(node);
                true
            }
            _ => false,
        }
    }

    fn to_record(&self, product: &Value) -> Option<ProductRecord> {
        let title = text_field(product, "name").filter(|t| !t.is_empty())?;
        let url = text_field(product, "url").map(|href| absolute_url(ORIGIN, &href));

        let id = text_field(product, "sku")
            .or_else(|| text_field(product, "productID"))
            .filter(|id| !id.is_empty())
            .or_else(|| url.clone())?;

        let mut record = ProductRecord::new(id, title, url.unwrap_or_default());

        record.image_url = match product.get("image") {
            Some(Value::String(src)) => Some(src.clone()),
            Some(Value::Array(images)) => images.first().and_then(Value::as_str).map(String::from),
            _ => None,
        }
        .filter(|src| !src.is_empty())
        .map(|src| absolute_url(ORIGIN, &src));

        record.brand = match product.get("brand") {
            Some(Value::String(brand)) => Some(brand.clone()),
            Some(brand) => text_field(brand, "name"),
            None => None,
        };

        let offer = match product.get("offers") {
            Some(Value::Array(offers)) => offers.first(),
            other => other,
        };

        if let Some(offer) = offer {
            record.price = match offer.get("price") {
                Some(Value::Number(n)) => n.as_f64().map(|p| format!("${:.2}", p)),
                Some(Value::String(s)) if !s.is_empty() => Some(match s.parse::<f64>() {
                    Ok(p) => format!("${:.2}", p),
                    Err(_) => s.clone(),
                }),
                _ => None,
            };

            record.availability = offer
                .get("availability")
                .and_then(Value::as_str)
                .map(schema_availability)
                .unwrap_or_default();
        }

        Some(record)
    }
}

/// Reads a string or number field as text.
fn text_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Maps a schema.org availability URL such as `https://schema.org/InStock`.
fn schema_availability(value: &str) -> Availability {
    let kind = value.rsplit('/').next().unwrap_or(value);
    match kind {
        "InStock" | "LimitedAvailability" | "OnlineOnly" | "InStoreOnly" => Availability::InStock,
        "OutOfStock" | "SoldOut" | "Discontinued" => Availability::OutOfStock,
        "PreOrder" | "PreSale" | "BackOrder" => Availability::PreOrder,
        _ => Availability::Unknown,
    }
}

impl Extractor for KmartExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::Kmart
    }

    fn page_url(&self, base: &str, page: u32) -> Option<String> {
        if page <= 1 {
            return Some(base.to_string());
        }
        Some(with_page_param(base, page))
    }

    fn search_url(&self, term: &str) -> Option<String> {
        Some(format!("{}/search/?searchTerm={}", ORIGIN, urlencoding::encode(term)))
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(raw);

        let mut documents = Vec::new();
        for script in document.select(&sel::JSON_LD) {
            match serde_json::from_str::<Value>(&script.text().collect::<String>()) {
                Ok(value) => documents.push(value),
                Err(e) => warn!("Skipping unreadable JSON-LD block: {}", e),
            }
        }

        let mut products = Vec::new();
        let mut found = false;
        for doc in &documents {
            found |= self.collect_products(doc, &mut products);
        }

        if !found {
            return Err(ExtractError::MissingStructure("JSON-LD product list".to_string()));
        }

        let mut extraction = Extraction::default();

        for product in products {
            match self.to_record(product) {
                Some(record) => {
                    trace!("Parsed product: {} - {}", record.id, record.title);
                    extraction.records.push(record);
                }
                None => extraction.skipped += 1,
            }
        }

        // Kmart renders no reliable next link; keep paging until a page comes back empty.
        extraction.has_more = !extraction.records.is_empty();

        debug!("Parsed {} Kmart products ({} skipped)", extraction.records.len(), extraction.skipped);

        Ok(extraction)
    }
}

/// Queries Kmart's availability API once per configured state.
pub struct KmartStockProbe {
    fetcher: Arc<dyn Fetcher>,
    states: Vec<AuState>,
    api_base: String,
}

impl KmartStockProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, states: Vec<AuState>) -> Self {
        Self::with_api_base(fetcher, states, AVAILABILITY_API)
    }

    /// Creates a probe against a custom endpoint (for testing).
    pub fn with_api_base(
        fetcher: Arc<dyn Fetcher>,
        states: Vec<AuState>,
        api_base: impl Into<String>,
    ) -> Self {
        Self { fetcher, states, api_base: api_base.into() }
    }

    fn availability_url(&self, sku: &str, state: AuState) -> String {
        format!(
            "{}?articleNumber={}&state={}&postcode={}",
            self.api_base,
            urlencoding::encode(sku),
            state.code(),
            state.capital_postcode()
        )
    }
}

/// Reads online and click-and-collect quantities from an availability response.
pub fn parse_availability(body: &str) -> Option<StockLevel> {
    let data: Value = serde_json::from_str(body).ok()?;
    let availability = data.pointer("/data/getProductAvailability/availability")?;

    let online = availability
        .pointer("/HOME_DELIVERY/0/stock/available")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let in_store = availability
        .pointer("/CLICK_AND_COLLECT/0/stock/totalAvailable")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    Some(StockLevel::new(clamp_quantity(online), clamp_quantity(in_store)))
}

fn clamp_quantity(quantity: u64) -> u32 {
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

#[async_trait]
impl StockProbe for KmartStockProbe {
    async fn probe(&self, record: &ProductRecord) -> Result<StockLevels, FetchError> {
        let mut levels = StockLevels::new();

        for state in &self.states {
            let url = self.availability_url(&record.id, *state);
            let body = self.fetcher.fetch_json(&url).await?;

            match parse_availability(&body) {
                Some(level) => {
                    debug!(
                        "[STOCK] {} {}: Online={}, In-Store={}",
                        record.id, state, level.online, level.in_store
                    );
                    levels.insert(state.code().to_string(), level);
                }
                None => debug!("[STOCK] No availability data for {} in {}", record.id, state),
            }
        }

        Ok(levels)
    }
}
