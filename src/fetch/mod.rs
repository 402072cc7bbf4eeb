//! HTTP fetching with TLS fingerprint emulation, retries and proxy rotation.

mod retry;

pub use retry::RetryPolicy;

use crate::config::Config;
use crate::error::FetchError;
use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Trait for page loading - enables mocking for tests.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Loads `url` and returns the response body.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;

    /// Loads a JSON API endpoint. Defaults to a plain page load.
    async fn fetch_json(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

/// Header flavour of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    /// Top-level page navigation
    Page,
    /// XHR-style call from an already loaded page
    Api,
}

/// Browser-impersonating HTTP client.
///
/// Holds one client per configured proxy (or a single direct client) and
/// moves to the next proxy whenever an attempt fails with a retryable error.
pub struct HttpFetcher {
    clients: Vec<Client>,
    current: AtomicUsize,
    retry: RetryPolicy,
    delay_ms: u64,
    delay_jitter_ms: u64,
}

impl HttpFetcher {
    /// Creates a fetcher from the monitor configuration.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::with_settings(
            &config.proxies,
            config.retry.policy(),
            config.request_delay_ms,
            config.request_jitter_ms,
        )
    }

    /// Creates a fetcher from explicit settings.
    pub fn with_settings(
        proxies: &[String],
        retry: RetryPolicy,
        delay_ms: u64,
        delay_jitter_ms: u64,
    ) -> Result<Self, FetchError> {
        let clients = if proxies.is_empty() {
            vec![build_client(None)?]
        } else {
            proxies.iter().map(|proxy| build_client(Some(proxy))).collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self { clients, current: AtomicUsize::new(0), retry, delay_ms, delay_jitter_ms })
    }

    /// Number of proxies in rotation (1 when connecting directly).
    pub fn pool_size(&self) -> usize {
        self.clients.len()
    }

    fn client(&self) -> &Client {
        let index = self.current.load(Ordering::Relaxed) % self.clients.len();
        &self.clients[index]
    }

    fn rotate(&self) {
        if self.clients.len() > 1 {
            let next = self.current.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("Rotating to proxy {}/{}", next % self.clients.len() + 1, self.clients.len());
        }
    }

    /// Performs one GET request with all anti-bot measures.
    async fn get_once(&self, url: &str, kind: RequestKind) -> Result<String, FetchError> {
        self.delay().await;

        debug!("GET {} ({:?})", url, kind);

        let request = self
            .client()
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("Accept-Language", "en-AU,en;q=0.9")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .header("Sec-Ch-Ua", "\"Chromium\";v=\"131\", \"Not_A Brand\";v=\"24\"")
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", "\"Windows\"");

        let request = match kind {
            RequestKind::Page => request
                .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8")
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "none")
                .header("Sec-Fetch-User", "?1")
                .header("Upgrade-Insecure-Requests", "1"),
            RequestKind::Api => request
                .header("Accept", "application/json, text/plain, */*")
                .header("Sec-Fetch-Dest", "empty")
                .header("Sec-Fetch-Mode", "cors")
                .header("Sec-Fetch-Site", "same-site"),
        };

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport { url: url.to_string(), message: e.to_string() })?;

        let status = response.status().as_u16();
        debug!("Response status: {}", status);

        if status == 429 || status == 503 {
            warn!("Rate limited ({}). Consider using a proxy or increasing the delay.", status);
            return Err(FetchError::RateLimited { url: url.to_string(), status });
        }

        if !response.status().is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport { url: url.to_string(), message: e.to_string() })
    }

    /// Adds a random delay to mimic human behavior.
    async fn delay(&self) {
        if self.delay_ms == 0 && self.delay_jitter_ms == 0 {
            return;
        }

        let jitter = if self.delay_jitter_ms > 0 {
            rand::rng().random_range(0..=self.delay_jitter_ms)
        } else {
            0
        };

        let total_delay = self.delay_ms + jitter;
        debug!("Delaying {}ms", total_delay);
        tokio::time::sleep(Duration::from_millis(total_delay)).await;
    }
}

fn build_client(proxy: Option<&String>) -> Result<Client, FetchError> {
    let mut builder = Client::builder()
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10));

    if let Some(proxy_url) = proxy {
        debug!("Configuring proxy: {}", proxy_url);
        let proxy = wreq::Proxy::all(proxy_url.as_str())
            .map_err(|e| FetchError::Client(format!("invalid proxy {}: {}", proxy_url, e)))?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| FetchError::Client(e.to_string()))
}

impl HttpFetcher {
    async fn get_with_retry(&self, url: &str, kind: RequestKind) -> Result<String, FetchError> {
        self.retry
            .run(move |_| async move {
                let result = self.get_once(url, kind).await;
                if matches!(&result, Err(e) if e.is_retryable()) {
                    self.rotate();
                }
                result
            })
            .await
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.get_with_retry(url, RequestKind::Page).await
    }

    async fn fetch_json(&self, url: &str) -> Result<String, FetchError> {
        self.get_with_retry(url, RequestKind::Api).await
    }
}
