//! Configuration management with TOML, environment variables, and CLI overrides.

use crate::error::ConfigError;
use crate::fetch::RetryPolicy;
use crate::retailers::{AuState, Retailer};
use crate::tracker::PrimingPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Placeholder shipped in sample configs; treated as unset.
pub const WEBHOOK_PLACEHOLDER: &str = "YOUR_DISCORD_WEBHOOK_URL_HERE";

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Retailer to monitor
    #[serde(default)]
    pub retailer: Retailer,

    /// Page to monitor; defaults to the retailer's Pokemon listing
    #[serde(default)]
    pub url: Option<String>,

    /// Search terms monitored instead of `url`
    #[serde(default)]
    pub search_terms: Vec<String>,

    /// Seconds between cycles; defaults per retailer
    #[serde(default)]
    pub poll_delay_secs: Option<u64>,

    /// Random jitter added to the poll delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Base delay before every page request in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Random jitter added to the request delay
    #[serde(default = "default_request_jitter_ms")]
    pub request_jitter_ms: u64,

    /// Pages fetched per source each cycle
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Proxy URLs rotated on failure (e.g., socks5://host:port)
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Output format for one-shot scrapes
    #[serde(default)]
    pub format: OutputFormat,

    /// How the first scrape is handled
    #[serde(default)]
    pub priming: PrimingPolicy,

    /// States probed for per-location stock (Kmart, Target)
    #[serde(default)]
    pub stock_regions: Vec<AuState>,

    /// Override for the regional availability endpoint
    #[serde(default)]
    pub stock_api: Option<String>,

    /// Filter: any of these must appear in the title
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Filter: any of these must appear in the title (checked after exclusions)
    #[serde(default)]
    pub include_keywords: Vec<String>,

    /// Filter: keywords that must NOT appear in title
    #[serde(default)]
    pub exclude_keywords: Vec<String>,

    /// Filter: minimum price
    #[serde(default)]
    pub min_price: Option<f64>,

    /// Filter: maximum price
    #[serde(default)]
    pub max_price: Option<f64>,

    /// Filter: minimum rating
    #[serde(default)]
    pub min_rating: Option<f32>,

    /// Filter: drop listings marked out of stock
    #[serde(default = "default_true")]
    pub in_stock_only: bool,

    /// Filter: Prime-eligible products only
    #[serde(default)]
    pub member_only: bool,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Discord webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Main webhook receiving every notification
    #[serde(default)]
    pub url: Option<String>,

    /// Display name for the webhook bot
    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub avatar_url: Option<String>,

    /// Embed colour; defaults to the retailer's brand colour
    #[serde(default)]
    pub colour: Option<u32>,

    /// Add eBay current/sold search links to embeds
    #[serde(default = "default_true")]
    pub marketplace_links: bool,

    /// Extra webhooks keyed by state code, for per-location stock
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            avatar_url: None,
            colour: None,
            marketplace_links: true,
            regions: BTreeMap::new(),
        }
    }
}

/// Retry settings for page requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

fn default_delay_jitter_ms() -> u64 {
    5000
}

fn default_request_jitter_ms() -> u64 {
    1500
}

fn default_max_pages() -> u32 {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    16000
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retailer: Retailer::default(),
            url: None,
            search_terms: Vec::new(),
            poll_delay_secs: None,
            delay_jitter_ms: default_delay_jitter_ms(),
            request_delay_ms: 0,
            request_jitter_ms: default_request_jitter_ms(),
            max_pages: default_max_pages(),
            proxies: Vec::new(),
            log_file: None,
            format: OutputFormat::Table,
            priming: PrimingPolicy::default(),
            stock_regions: Vec::new(),
            stock_api: None,
            keywords: Vec::new(),
            include_keywords: Vec::new(),
            exclude_keywords: Vec::new(),
            min_price: None,
            max_price: None,
            min_rating: None,
            in_stock_only: true,
            member_only: false,
            webhook: WebhookConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("au-stock-monitor").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(retailer) = std::env::var("MONITOR_RETAILER") {
            if let Ok(r) = retailer.parse() {
                self.retailer = r;
            }
        }

        if let Ok(webhook) = std::env::var("MONITOR_WEBHOOK") {
            self.webhook.url = Some(webhook);
        }

        if let Ok(proxy) = std::env::var("MONITOR_PROXY") {
            self.proxies = split_list(&proxy);
        }

        if let Ok(delay) = std::env::var("MONITOR_DELAY") {
            if let Ok(d) = delay.parse() {
                self.poll_delay_secs = Some(d);
            }
        }

        self
    }

    /// Page monitored when no search terms are set.
    pub fn page_url(&self) -> Result<String, ConfigError> {
        match (&self.url, self.retailer.default_url()) {
            (Some(url), _) => Ok(url.clone()),
            (None, Some(url)) => Ok(url.to_string()),
            (None, None) => Err(ConfigError::MissingUrl(self.retailer.display_name().to_string())),
        }
    }

    /// Delay between cycles, before jitter.
    pub fn poll_delay(&self) -> Duration {
        Duration::from_secs(self.poll_delay_secs.unwrap_or_else(|| self.retailer.default_poll_secs()))
    }

    /// Checks everything a one-shot scrape needs.
    pub fn validate_sources(&self) -> Result<(), ConfigError> {
        if self.search_terms.is_empty() {
            self.page_url()?;
        }

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(ConfigError::InvalidPriceRange { min, max });
            }
        }

        if self.max_pages == 0 {
            return Err(ConfigError::ZeroPages);
        }

        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        Ok(())
    }

    /// Checks everything the monitor loop needs. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_webhook()?;
        self.validate_sources()
    }

    /// Checks the main and regional webhook URLs.
    pub fn validate_webhook(&self) -> Result<(), ConfigError> {
        let webhook = self
            .webhook
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty() && *url != WEBHOOK_PLACEHOLDER)
            .ok_or(ConfigError::MissingWebhook)?;

        if !is_http(webhook) {
            return Err(ConfigError::InvalidWebhook(webhook.to_string()));
        }

        for (region, url) in &self.webhook.regions {
            if !url.trim().is_empty() && !is_http(url) {
                return Err(ConfigError::InvalidRegionWebhook { region: region.clone(), url: url.clone() });
            }
        }

        Ok(())
    }
}

fn is_http(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn split_list(value: &str) -> Vec<String> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_webhook(url: &str) -> Config {
        let mut config = Config::default();
        config.webhook.url = Some(url.to_string());
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retailer, Retailer::Amazon);
        assert_eq!(config.max_pages, 1);
        assert_eq!(config.priming, PrimingPolicy::AcceptEmpty);
        assert!(config.in_stock_only);
        assert!(!config.member_only);
        assert!(config.proxies.is_empty());
        assert!(config.webhook.url.is_none());
        assert!(config.webhook.marketplace_links);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.format, OutputFormat::Table);
        assert_eq!(config.poll_delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            retailer = "kmart"
            poll_delay_secs = 45
            max_pages = 3
            priming = "require_products"
            stock_regions = ["NSW", "VIC"]
            include_keywords = ["booster", "tin"]
            exclude_keywords = ["plush"]
            in_stock_only = false

            [webhook]
            url = "https://discord.com/api/webhooks/1/abc"
            colour = 3447003
            marketplace_links = false

            [webhook.regions]
            NSW = "https://discord.com/api/webhooks/2/nsw"

            [retry]
            max_attempts = 5
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.retailer, Retailer::Kmart);
        assert_eq!(config.poll_delay(), Duration::from_secs(45));
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.priming, PrimingPolicy::RequireProducts);
        assert_eq!(config.stock_regions, vec![AuState::Nsw, AuState::Vic]);
        assert_eq!(config.include_keywords, vec!["booster", "tin"]);
        assert!(!config.in_stock_only);
        assert_eq!(config.webhook.colour, Some(3447003));
        assert!(!config.webhook.marketplace_links);
        assert_eq!(config.webhook.regions.len(), 1);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_retry_policy() {
        let retry = RetryConfig { max_attempts: 4, base_delay_ms: 500, max_delay_ms: 2000 };
        let policy = retry.policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_secs(2));
    }

    #[test]
    fn test_page_url() {
        let config = Config { retailer: Retailer::BigW, ..Config::default() };
        assert!(config.page_url().unwrap().contains("bigw.com.au"));

        let config = Config { url: Some("https://x.test/c".into()), ..Config::default() };
        assert_eq!(config.page_url().unwrap(), "https://x.test/c");

        let config = Config { retailer: Retailer::Shopify, ..Config::default() };
        assert_eq!(config.page_url(), Err(ConfigError::MissingUrl("Shopify".into())));
    }

    #[test]
    fn test_validate_webhook() {
        assert_eq!(Config::default().validate(), Err(ConfigError::MissingWebhook));
        assert_eq!(with_webhook(WEBHOOK_PLACEHOLDER).validate(), Err(ConfigError::MissingWebhook));
        assert_eq!(with_webhook("  ").validate(), Err(ConfigError::MissingWebhook));
        assert_eq!(
            with_webhook("discord.com/api/webhooks/1").validate(),
            Err(ConfigError::InvalidWebhook("discord.com/api/webhooks/1".into()))
        );
        assert!(with_webhook("https://discord.com/api/webhooks/1/abc").validate().is_ok());
    }

    #[test]
    fn test_validate_region_webhook() {
        let mut config = with_webhook("https://discord.com/api/webhooks/1/abc");
        config.webhook.regions.insert("VIC".into(), String::new());
        assert!(config.validate().is_ok());

        config.webhook.regions.insert("QLD".into(), "ftp://nope".into());
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRegionWebhook { region: "QLD".into(), url: "ftp://nope".into() })
        );
    }

    #[test]
    fn test_validate_sources() {
        let mut config = with_webhook("https://discord.com/api/webhooks/1/abc");
        config.min_price = Some(50.0);
        config.max_price = Some(10.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidPriceRange { min: 50.0, max: 10.0 }));

        let config = Config { max_pages: 0, ..Config::default() };
        assert_eq!(config.validate_sources(), Err(ConfigError::ZeroPages));

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert_eq!(config.validate_sources(), Err(ConfigError::ZeroAttempts));

        let config = Config {
            retailer: Retailer::Shopify,
            search_terms: vec!["pokemon".into()],
            ..Config::default()
        };
        assert!(config.validate_sources().is_ok());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Table.to_string(), "table");
        assert_eq!(OutputFormat::Markdown.to_string(), "markdown");
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            retailer = "ebgames"
            proxies = ["socks5://localhost:1080"]
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.retailer, Retailer::EbGames);
        assert_eq!(config.proxies, vec!["socks5://localhost:1080"]);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let err = Config::from_file("/nonexistent/path/config.toml").unwrap_err().to_string();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let err = Config::from_file(file.path()).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "retailer = \"target\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.retailer, Retailer::Target);
    }

    #[test]
    fn test_config_with_env() {
        let vars = ["MONITOR_RETAILER", "MONITOR_WEBHOOK", "MONITOR_PROXY", "MONITOR_DELAY"];
        let saved: Vec<_> = vars.iter().map(|v| std::env::var(v).ok()).collect();

        std::env::set_var("MONITOR_RETAILER", "big-w");
        std::env::set_var("MONITOR_WEBHOOK", "https://discord.com/api/webhooks/9/z");
        std::env::set_var("MONITOR_PROXY", "http://a:1, socks5://b:2");
        std::env::set_var("MONITOR_DELAY", "not_a_number");

        let config = Config::new().with_env();
        assert_eq!(config.retailer, Retailer::BigW);
        assert_eq!(config.webhook.url.as_deref(), Some("https://discord.com/api/webhooks/9/z"));
        assert_eq!(config.proxies, vec!["http://a:1", "socks5://b:2"]);
        assert!(config.poll_delay_secs.is_none());

        for (var, value) in vars.iter().zip(saved) {
            match value {
                Some(v) => std::env::set_var(var, v),
                None => std::env::remove_var(var),
            }
        }
    }
}
