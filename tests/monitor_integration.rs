//! End-to-end monitor cycles against a mock storefront and webhook.

use au_stock_monitor::config::Config;
use au_stock_monitor::fetch::{HttpFetcher, RetryPolicy};
use au_stock_monitor::monitor::Monitor;
use au_stock_monitor::notify::DiscordNotifier;
use au_stock_monitor::retailers::Retailer;
use au_stock_monitor::tracker::PrimingPolicy;
use au_stock_monitor::CycleOutcome;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SHOPIFY_FIXTURE: &str = include_str!("fixtures/shopify_products.json");

fn product(id: u64, title: &str, english_available: bool) -> Value {
    json!({
        "id": id,
        "title": title,
        "handle": format!("product-{}", id),
        "vendor": "Pokemon",
        "variants": [
            { "title": "English", "price": "99.00", "available": english_available },
            { "title": "Japanese", "price": "120.00", "available": true }
        ],
        "images": []
    })
}

/// Replaces the storefront and webhook mocks, clearing recorded requests.
async fn serve(server: &MockServer, feed: String) {
    server.reset().await;

    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(feed))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/webhook"))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

async fn webhook_posts(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == "/webhook")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

fn make_monitor(server: &MockServer, priming: PrimingPolicy) -> Monitor {
    let mut config = Config {
        retailer: Retailer::Shopify,
        url: Some(format!("{}/products.json", server.uri())),
        priming,
        ..Config::default()
    };
    config.webhook.url = Some(format!("{}/webhook", server.uri()));

    let retry = RetryPolicy::new(1, Duration::ZERO, Duration::ZERO);
    let fetcher = HttpFetcher::with_settings(&[], retry, 0, 0).unwrap();
    let notifier = DiscordNotifier::new(config.retailer, &config.webhook).unwrap();

    Monitor::from_config(&config, Arc::new(fetcher), Arc::new(notifier)).unwrap()
}

async fn cycle(monitor: &mut Monitor) -> CycleOutcome {
    let outcome = monitor.run_cycle().await;
    monitor.flush_deliveries().await;
    outcome
}

#[tokio::test]
async fn test_prime_then_report_new_product_once() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::AcceptEmpty);

    // First cycle only primes
    serve(&server, SHOPIFY_FIXTURE.to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("priming cycle failed");
    };
    assert!(report.primed);
    assert_eq!(report.scraped, 3);
    // The sold-out sleeves are filtered before tracking
    assert_eq!(report.matched, 2);
    assert!(webhook_posts(&server).await.is_empty());

    // A new listing appears
    let mut feed: Value = serde_json::from_str(SHOPIFY_FIXTURE).unwrap();
    feed["products"].as_array_mut().unwrap().push(product(7100, "Pokemon Destined Rivals Booster Bundle", true));
    serve(&server, feed.to_string()).await;

    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("second cycle failed");
    };
    assert_eq!(report.new, 1);

    let posts = webhook_posts(&server).await;
    assert_eq!(posts.len(), 1);
    let embed = &posts[0]["embeds"][0];
    assert_eq!(embed["title"], "Pokemon Destined Rivals Booster Bundle");
    assert_eq!(embed["footer"]["text"], "Shopify Stock Monitor");
    assert_eq!(posts[0]["username"], "Shopify Monitor");

    // Same feed again reports nothing
    serve(&server, feed.to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("third cycle failed");
    };
    assert_eq!(report.new, 0);
    assert_eq!(report.restocked, 0);
    assert!(webhook_posts(&server).await.is_empty());

    let stats = monitor.stats();
    assert_eq!(stats.cycles, 3);
    assert_eq!(stats.notifications_sent, 1);
}

#[tokio::test]
async fn test_variant_restock_is_announced() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::AcceptEmpty);

    let feed = |english_available| json!({ "products": [product(7200, "Pokemon 151 Booster Bundle", english_available)] });

    serve(&server, feed(false).to_string()).await;
    cycle(&mut monitor).await;

    serve(&server, feed(true).to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("restock cycle failed");
    };
    assert_eq!(report.restocked, 1);

    let posts = webhook_posts(&server).await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0]["embeds"][0]["description"], "Back in stock");
}

#[tokio::test]
async fn test_empty_first_scrape_primes_with_accept_empty() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::AcceptEmpty);

    serve(&server, json!({ "products": [] }).to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("empty cycle failed");
    };
    assert!(report.primed);

    // Everything found after an empty priming scrape is new
    serve(&server, SHOPIFY_FIXTURE.to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("second cycle failed");
    };
    assert_eq!(report.new, 2);
    assert_eq!(webhook_posts(&server).await.len(), 2);
}

#[tokio::test]
async fn test_empty_first_scrape_deferred_with_require_products() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::RequireProducts);

    serve(&server, json!({ "products": [] }).to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("empty cycle failed");
    };
    assert!(!report.primed);

    serve(&server, SHOPIFY_FIXTURE.to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("second cycle failed");
    };
    assert!(report.primed);
    assert_eq!(report.new, 0);
    assert!(webhook_posts(&server).await.is_empty());
}

#[tokio::test]
async fn test_failed_fetch_keeps_tracked_set() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::AcceptEmpty);

    serve(&server, SHOPIFY_FIXTURE.to_string()).await;
    cycle(&mut monitor).await;
    assert_eq!(monitor.tracker().len(), 2);

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/products.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = cycle(&mut monitor).await;
    assert!(matches!(outcome, CycleOutcome::FetchFailed(_)));
    assert_eq!(monitor.tracker().len(), 2);

    // Recovery does not re-announce anything
    serve(&server, SHOPIFY_FIXTURE.to_string()).await;
    let CycleOutcome::Completed(report) = cycle(&mut monitor).await else {
        panic!("recovery cycle failed");
    };
    assert_eq!(report.new, 0);
    assert_eq!(report.removed, 0);
    assert!(webhook_posts(&server).await.is_empty());
    assert_eq!(monitor.stats().failed_cycles, 1);
}

#[tokio::test]
async fn test_html_error_page_is_extract_failure() {
    let server = MockServer::start().await;
    let mut monitor = make_monitor(&server, PrimingPolicy::AcceptEmpty);

    serve(&server, "<html><body>Store password protected</body></html>".to_string()).await;
    let outcome = cycle(&mut monitor).await;

    assert!(matches!(outcome, CycleOutcome::ExtractFailed(_)));
    assert!(monitor.tracker().is_empty());
}
