//! Target AU search page extraction from product links, plus per-state
//! stock from the store stock-status API.

use super::selectors::target as sel;
use super::{absolute_url, squash_whitespace, AuState, Extraction, Extractor, Retailer, StockProbe};
use crate::error::{ExtractError, FetchError};
use crate::fetch::Fetcher;
use crate::models::{ProductRecord, StockLevel, StockLevels};
use async_trait::async_trait;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use tokio::sync::OnceCell;
use tracing::{debug, trace, warn};

const ORIGIN: &str = "https://www.target.com.au";

/// REST root serving the store directory and store stock status.
pub const STOCK_API: &str = "https://www.target.com.au/rest/v2/target";

/// Status reported for a store or delivery mode that can fulfil an order.
const IN_STOCK: &str = "inStock";
const MIN_TITLE_LEN: usize = 5;

/// How many ancestors to search for a price next to a product link.
const PRICE_SEARCH_DEPTH: usize = 3;

static PRODUCT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/p/([^/?#]+)/(\d+)").unwrap());

/// Extracts products from the `/p/<slug>/<id>` links on Target search pages.
#[derive(Debug, Default)]
pub struct TargetExtractor;

impl TargetExtractor {
    pub fn new() -> Self {
        Self
    }

    fn nearby_price(&self, link: ElementRef) -> Option<String> {
        link.ancestors()
            .filter_map(ElementRef::wrap)
            .take(PRICE_SEARCH_DEPTH)
            .find_map(|parent| parent.select(&sel::PRICE).next())
            .map(|price| squash_whitespace(&price.text().collect::<String>()))
            .filter(|price| !price.is_empty())
    }
}

/// Turns `pokemon-tcg-mini-tin` into `Pokemon Tcg Mini Tin`.
fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl Extractor for TargetExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::Target
    }

    fn search_url(&self, term: &str) -> Option<String> {
        Some(format!("{}/search?sEngine=c&text={}", ORIGIN, urlencoding::encode(term)))
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(raw);

        let links: Vec<ElementRef> = document.select(&sel::PRODUCT_LINK).collect();
        if links.is_empty() && document.select(&sel::LISTING).next().is_none() {
            return Err(ExtractError::MissingStructure("product links".to_string()));
        }

        let mut extraction = Extraction::default();
        let mut seen = HashSet::new();

        for link in links {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let url = absolute_url(ORIGIN, href);

            // Links to category or help pages share the /p/ prefix but carry no id.
            let Some(caps) = PRODUCT_PATH.captures(&url) else {
                continue;
            };
            let slug = caps[1].to_string();
            let id = caps[2].to_string();

            // Image and title links point at the same product.
            if !seen.insert(id.clone()) {
                continue;
            }

            let image = link.select(&sel::IMAGE).next();

            let mut title = image
                .and_then(|img| img.value().attr("alt"))
                .map(squash_whitespace)
                .filter(|alt| !alt.is_empty())
                .unwrap_or_else(|| squash_whitespace(&link.text().collect::<String>()));

            if title.chars().count() < MIN_TITLE_LEN {
                title = title_from_slug(&slug);
            }

            if title.chars().count() < MIN_TITLE_LEN {
                extraction.skipped += 1;
                continue;
            }

            let mut record = ProductRecord::new(id, title, url);
            record.image_url = image
                .and_then(|img| img.value().attr("src"))
                .filter(|src| !src.is_empty())
                .map(|src| absolute_url(ORIGIN, src));
            record.price = self.nearby_price(link);

            trace!("Parsed product: {} - {}", record.id, record.title);
            extraction.records.push(record);
        }

        debug!("Parsed {} Target products ({} skipped)", extraction.records.len(), extraction.skipped);

        Ok(extraction)
    }
}

/// Reads store numbers and their states from a store search response.
///
/// The state comes from `address.state` (or `district`) and falls back to the
/// postcode when missing or unrecognised. Stores with neither are dropped.
pub fn parse_store_states(body: &str) -> Option<Vec<(String, AuState)>> {
    let data: Value = serde_json::from_str(body).ok()?;
    let stores = data.get("stores")?.as_array()?;

    let mapped = stores
        .iter()
        .filter_map(|store| {
            let number = text_field(store, "storeNumber")?;
            let address = store.get("address");

            let state = address
                .and_then(|a| text_field(a, "state").or_else(|| text_field(a, "district")))
                .and_then(|name| name.parse::<AuState>().ok())
                .or_else(|| address.and_then(|a| text_field(a, "postalCode")).and_then(|p| AuState::from_postcode(&p)));

            match state {
                Some(state) => Some((number, state)),
                None => {
                    trace!("Store {} has no recognisable state", number);
                    None
                }
            }
        })
        .collect();

    Some(mapped)
}

/// Store stock for one product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreStock {
    /// Home delivery can fulfil an order
    pub online: bool,
    /// Store numbers reporting stock on hand
    pub stores: Vec<String>,
}

/// Reads the first product of a stock-status response.
pub fn parse_stock_status(body: &str) -> Option<StoreStock> {
    let data: Value = serde_json::from_str(body).ok()?;
    let item = data.get("stock")?.as_array()?.first()?;

    let online = item.get("hd").and_then(Value::as_str) == Some(IN_STOCK);

    let mut stores: Vec<String> = item
        .get("storeSoh")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
        .filter(|(_, status)| status.as_str() == Some(IN_STOCK))
        .map(|(number, _)| number.clone())
        .collect();
    stores.sort();

    Some(StoreStock { online, stores })
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Groups Target store stock by state.
///
/// The store directory is loaded on first use and then kept. A failed load
/// is retried on the next lookup.
pub struct TargetStockProbe {
    fetcher: Arc<dyn Fetcher>,
    states: Vec<AuState>,
    api_base: String,
    stores: OnceCell<HashMap<String, AuState>>,
}

impl TargetStockProbe {
    pub fn new(fetcher: Arc<dyn Fetcher>, states: Vec<AuState>) -> Self {
        Self::with_api_base(fetcher, states, STOCK_API)
    }

    /// Uses a custom REST root (for testing).
    pub fn with_api_base(
        fetcher: Arc<dyn Fetcher>,
        states: Vec<AuState>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base = api_base.into().trim_end_matches('/').to_string();
        Self { fetcher, states, api_base, stores: OnceCell::new() }
    }

    fn stores_url(&self, term: &str) -> String {
        format!("{}/stores/?fields=FULL&query={}&pageSize=1000", self.api_base, urlencoding::encode(term))
    }

    fn stock_status_url(&self, product_id: &str) -> String {
        format!("{}/lz3inventory/stockStatus?products={}", self.api_base, urlencoding::encode(product_id))
    }

    /// Store number to state for every store found near the configured states.
    async fn store_states(&self) -> Result<&HashMap<String, AuState>, FetchError> {
        self.stores.get_or_try_init(|| self.load_store_states()).await
    }

    async fn load_store_states(&self) -> Result<HashMap<String, AuState>, FetchError> {
        let mut stores = HashMap::new();
        let mut last_error = None;

        for state in &self.states {
            for term in [state.code(), state.capital_city()] {
                let body = match self.fetcher.fetch_json(&self.stores_url(term)).await {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("[STORES] Store search for '{}' failed: {}", term, e);
                        last_error = Some(e);
                        continue;
                    }
                };

                match parse_store_states(&body) {
                    Some(found) => {
                        debug!("[STORES] '{}': {} store(s)", term, found.len());
                        for (number, state) in found {
                            stores.entry(number).or_insert(state);
                        }
                    }
                    None => warn!("[STORES] Unreadable store search response for '{}'", term),
                }
            }
        }

        match last_error {
            Some(e) if stores.is_empty() => Err(e),
            _ => {
                debug!("[STORES] Mapped {} store(s) to states", stores.len());
                Ok(stores)
            }
        }
    }
}

#[async_trait]
impl StockProbe for TargetStockProbe {
    async fn probe(&self, record: &ProductRecord) -> Result<StockLevels, FetchError> {
        let store_states = self.store_states().await?;
        let body = self.fetcher.fetch_json(&self.stock_status_url(&record.id)).await?;

        let Some(status) = parse_stock_status(&body) else {
            debug!("[STOCK] No stock status for {}", record.id);
            return Ok(StockLevels::new());
        };

        let mut counts: HashMap<AuState, u32> = HashMap::new();
        let mut unknown = 0;
        for number in &status.stores {
            match store_states.get(number) {
                Some(state) => *counts.entry(*state).or_default() += 1,
                None => unknown += 1,
            }
        }
        if unknown > 0 {
            debug!("[STOCK] {} store(s) with stock for {} have no known state", unknown, record.id);
        }

        let online = u32::from(status.online);
        let levels: StockLevels = self
            .states
            .iter()
            .map(|state| {
                let level = StockLevel::new(online, counts.get(state).copied().unwrap_or(0));
                debug!(
                    "[STOCK] {} {}: Online={}, In-Store={}",
                    record.id, state, level.online, level.in_store
                );
                (state.code().to_string(), level)
            })
            .collect();

        Ok(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page(body: &str) -> String {
        format!("<html><body><main>{}</main></body></html>", body)
    }

    #[test]
    fn test_extract_products() {
        let html = page(
            r#"<div class="product">
                 <a href="/p/pokemon-tcg-mini-tin/69123456"><img alt="Pokemon TCG Mini Tin" src="https://images.target.com.au/69123456.jpg"></a>
                 <a href="/p/pokemon-tcg-mini-tin/69123456">Pokemon TCG Mini Tin</a>
                 <span class="ProductPrice">$12.00</span>
               </div>
               <section><div><div class="product">
                 <a href="https://www.target.com.au/p/pokemon-elite-trainer-box/69999999">Pokemon Elite Trainer Box</a>
               </div></div></section>"#,
        );

        let extraction = TargetExtractor::new().extract(&html).unwrap();
        assert_eq!(extraction.records.len(), 2);

        let tin = &extraction.records[0];
        assert_eq!(tin.id, "69123456");
        assert_eq!(tin.title, "Pokemon TCG Mini Tin");
        assert_eq!(tin.url, "https://www.target.com.au/p/pokemon-tcg-mini-tin/69123456");
        assert_eq!(tin.price.as_deref(), Some("$12.00"));
        assert_eq!(tin.image_url.as_deref(), Some("https://images.target.com.au/69123456.jpg"));

        let etb = &extraction.records[1];
        assert_eq!(etb.id, "69999999");
        assert!(etb.price.is_none());
    }

    #[test]
    fn test_title_falls_back_to_slug() {
        let html = page(r#"<a href="/p/pokemon-booster-bundle/123"><img alt="" src="x.jpg"></a>"#);

        let record = &TargetExtractor::new().extract(&html).unwrap().records[0];
        assert_eq!(record.title, "Pokemon Booster Bundle");
    }

    #[test]
    fn test_short_title_skipped() {
        let html = page(r#"<a href="/p/tcg/123">TCG</a><a href="/p/help">Help</a>"#);

        let extraction = TargetExtractor::new().extract(&html).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.skipped, 1);
    }

    #[test]
    fn test_missing_structure() {
        let err = TargetExtractor::new().extract("<html><body><p>Access denied</p></body></html>").unwrap_err();
        assert!(matches!(err, ExtractError::MissingStructure(_)));
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("pokemon-tcg-MINI-tin"), "Pokemon Tcg Mini Tin");
        assert_eq!(title_from_slug(""), "");
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            TargetExtractor::new().search_url("pokemon cards").as_deref(),
            Some("https://www.target.com.au/search?sEngine=c&text=pokemon%20cards")
        );
    }

    #[test]
    fn test_parse_store_states() {
        let body = json!({ "stores": [
            { "storeNumber": "5001", "name": "Bondi", "address": { "state": "NSW", "postalCode": "2026" } },
            { "storeNumber": 5002, "name": "Chadstone", "address": { "state": "Victoria" } },
            { "storeNumber": "5003", "name": "Belconnen", "address": { "district": "", "postalCode": "2617" } },
            { "storeNumber": "5004", "name": "Perth", "address": { "state": "Western Aust.", "postalCode": "6000" } },
            { "storeNumber": "5005", "name": "Nowhere", "address": {} },
            { "name": "No number", "address": { "state": "QLD" } }
        ]})
        .to_string();

        let stores = parse_store_states(&body).unwrap();
        assert_eq!(
            stores,
            vec![
                ("5001".to_string(), AuState::Nsw),
                ("5002".to_string(), AuState::Vic),
                ("5003".to_string(), AuState::Act),
                ("5004".to_string(), AuState::Wa),
            ]
        );
        assert!(parse_store_states("<html>").is_none());
    }

    #[test]
    fn test_parse_stock_status() {
        let body = json!({ "stock": [{
            "hd": "inStock",
            "cc": "inStock",
            "storeSoh": { "5003": "inStock", "5001": "inStock", "5002": "noStock" }
        }]})
        .to_string();

        let status = parse_stock_status(&body).unwrap();
        assert!(status.online);
        assert_eq!(status.stores, vec!["5001", "5003"]);

        let sold_out = json!({ "stock": [{ "hd": "noStock" }] }).to_string();
        assert_eq!(parse_stock_status(&sold_out), Some(StoreStock::default()));
        assert!(parse_stock_status(r#"{"stock":[]}"#).is_none());
    }

    mod stock_lookup {
        use super::*;
        use crate::fetch::{HttpFetcher, RetryPolicy};
        use std::time::Duration;
        use wiremock::matchers::{header, headers, method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn make_fetcher() -> Arc<dyn Fetcher> {
            let retry = RetryPolicy::new(1, Duration::ZERO, Duration::ZERO);
            Arc::new(HttpFetcher::with_settings(&[], retry, 0, 0).unwrap())
        }

        async fn mount_stores(server: &MockServer, term: &str, stores: Value, expected: u64) {
            Mock::given(method("GET"))
                .and(path("/rest/v2/target/stores/"))
                .and(query_param("query", term))
                .and(headers("Accept", vec!["application/json", "text/plain", "*/*"]))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stores": stores })))
                .expect(expected)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_stock_grouped_by_state() {
            let server = MockServer::start().await;

            mount_stores(
                &server,
                "NSW",
                json!([
                    { "storeNumber": "5001", "address": { "state": "NSW" } },
                    { "storeNumber": "5002", "address": { "state": "NSW" } }
                ]),
                1,
            )
            .await;
            mount_stores(&server, "Sydney", json!([{ "storeNumber": "5001", "address": { "state": "NSW" } }]), 1)
                .await;
            mount_stores(&server, "VIC", json!([{ "storeNumber": "5100", "address": { "postalCode": "3148" } }]), 1)
                .await;
            mount_stores(&server, "Melbourne", json!([]), 1).await;

            Mock::given(method("GET"))
                .and(path("/rest/v2/target/lz3inventory/stockStatus"))
                .and(query_param("products", "69123456"))
                .and(header("Sec-Fetch-Mode", "cors"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stock": [{
                    "hd": "noStock",
                    "storeSoh": { "5001": "inStock", "5002": "inStock", "5100": "noStock", "7777": "inStock" }
                }]})))
                .expect(2)
                .mount(&server)
                .await;

            let api = format!("{}/rest/v2/target/", server.uri());
            let lookup = TargetStockProbe::with_api_base(make_fetcher(), vec![AuState::Nsw, AuState::Vic], api);
            let record = ProductRecord::new("69123456", "Pokemon TCG Mini Tin", "u");

            let levels = lookup.probe(&record).await.unwrap();
            assert_eq!(levels.len(), 2);
            assert_eq!(levels["NSW"], StockLevel::new(0, 2));
            assert_eq!(levels["VIC"], StockLevel::new(0, 0));

            // The store directory is only loaded once
            let again = lookup.probe(&record).await.unwrap();
            assert_eq!(again, levels);
        }

        #[tokio::test]
        async fn test_online_stock_reaches_every_state() {
            let server = MockServer::start().await;

            mount_stores(&server, "QLD", json!([{ "storeNumber": "5200", "address": { "state": "qld" } }]), 1).await;
            mount_stores(&server, "Brisbane", json!([]), 1).await;

            Mock::given(method("GET"))
                .and(path("/rest/v2/target/lz3inventory/stockStatus"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stock": [{
                    "hd": "inStock",
                    "storeSoh": {}
                }]})))
                .mount(&server)
                .await;

            let api = format!("{}/rest/v2/target", server.uri());
            let lookup = TargetStockProbe::with_api_base(make_fetcher(), vec![AuState::Qld], api);

            let levels = lookup.probe(&ProductRecord::new("1", "Tin", "u")).await.unwrap();
            assert_eq!(levels["QLD"], StockLevel::new(1, 0));
        }

        #[tokio::test]
        async fn test_store_directory_failure_is_an_error() {
            let server = MockServer::start().await;

            Mock::given(method("GET"))
                .and(path("/rest/v2/target/stores/"))
                .respond_with(ResponseTemplate::new(403))
                .mount(&server)
                .await;

            let api = format!("{}/rest/v2/target", server.uri());
            let lookup = TargetStockProbe::with_api_base(make_fetcher(), vec![AuState::Sa], api);

            let result = lookup.probe(&ProductRecord::new("1", "Tin", "u")).await;
            assert!(matches!(result, Err(FetchError::Status { status: 403, .. })));
            assert!(lookup.stores.get().is_none());
        }

        #[tokio::test]
        async fn test_missing_stock_status_gives_no_levels() {
            let server = MockServer::start().await;

            mount_stores(&server, "TAS", json!([{ "storeNumber": "5300", "address": { "state": "TAS" } }]), 1).await;
            mount_stores(&server, "Hobart", json!([]), 1).await;

            Mock::given(method("GET"))
                .and(path("/rest/v2/target/lz3inventory/stockStatus"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "stock": [] })))
                .mount(&server)
                .await;

            let api = format!("{}/rest/v2/target", server.uri());
            let lookup = TargetStockProbe::with_api_base(make_fetcher(), vec![AuState::Tas], api);

            let levels = lookup.probe(&ProductRecord::new("1", "Tin", "u")).await.unwrap();
            assert!(levels.is_empty());
        }
    }
}
