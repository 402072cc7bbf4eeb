//! Error types for the fetch, extract, notify and configuration boundaries.

use thiserror::Error;

/// Failure to load a page. Transient variants are retried by the fetch policy.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("rate limited by {url} (HTTP {status})")]
    RateLimited { url: String, status: u16 },

    #[error("request to {url} failed with status: {status}")]
    Status { url: String, status: u16 },

    #[error("failed to configure HTTP client: {0}")]
    Client(String),
}

impl FetchError {
    /// True for errors worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport { .. } | FetchError::RateLimited { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Client(_) => false,
        }
    }
}

/// Failure to find the expected product data in a fetched page.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("expected page structure not found: {0}")]
    MissingStructure(String),

    #[error("blocked by anti-bot page: {0}")]
    Blocked(String),

    #[error("malformed embedded data: {0}")]
    Malformed(String),
}

/// Failure to deliver a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(String),

    #[error("webhook rejected notification (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to encode webhook payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Configuration problems detected at startup. These halt before the loop starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("webhook URL is not configured")]
    MissingWebhook,

    #[error("webhook URL must be http(s): {0}")]
    InvalidWebhook(String),

    #[error("regional webhook for {region} must be http(s): {url}")]
    InvalidRegionWebhook { region: String, url: String },

    #[error("min_price ({min}) is greater than max_price ({max})")]
    InvalidPriceRange { min: f64, max: f64 },

    #[error("max_pages must be at least 1")]
    ZeroPages,

    #[error("retry.max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("{0} has no default page; set `url` in the config")]
    MissingUrl(String),
}
