//! Discord webhook embeds.

use super::{EventKind, Notification, Notifier};
use crate::config::WebhookConfig;
use crate::error::NotifyError;
use crate::retailers::Retailer;
use async_trait::async_trait;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use wreq::Client;

/// Discord rejects embed titles longer than this.
const MAX_TITLE_CHARS: usize = 256;

/// Discord rejects embed field values longer than this.
const MAX_FIELD_CHARS: usize = 1024;

/// Encoded length budget of one eBay search query. Both links plus their
/// markdown must stay under `MAX_FIELD_CHARS`.
const MAX_QUERY_LEN: usize = 400;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    pub footer: EmbedFooter,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedThumbnail>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: value.into(), inline: false }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedThumbnail {
    pub url: String,
}

/// Posts one embed per notification to a Discord webhook, with optional
/// per-state webhooks.
pub struct DiscordNotifier {
    client: Client,
    retailer: Retailer,
    webhook_url: String,
    regions: HashMap<String, String>,
    username: Option<String>,
    avatar_url: Option<String>,
    colour: u32,
    marketplace_links: bool,
}

impl DiscordNotifier {
    /// Creates a notifier for `retailer` from the validated webhook settings.
    pub fn new(retailer: Retailer, config: &WebhookConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let regions = config
            .regions
            .iter()
            .filter(|(_, url)| !url.trim().is_empty())
            .map(|(region, url)| (region.to_uppercase(), url.clone()))
            .collect();

        Ok(Self {
            client,
            retailer,
            webhook_url: config.url.clone().unwrap_or_default(),
            regions,
            username: config.username.clone().or_else(|| Some(format!("{} Monitor", retailer.display_name()))),
            avatar_url: config.avatar_url.clone(),
            colour: config.colour.unwrap_or_else(|| retailer.colour()),
            marketplace_links: config.marketplace_links,
        })
    }

    /// Webhook a notification is posted to.
    fn destination(&self, notification: &Notification) -> &str {
        notification
            .location
            .as_ref()
            .and_then(|location| self.regions.get(&location.to_uppercase()))
            .map(String::as_str)
            .unwrap_or(&self.webhook_url)
    }

    /// Builds the webhook body for a notification.
    pub fn render(&self, notification: &Notification) -> WebhookPayload {
        let record = &notification.record;
        let store = notification.retailer.display_name();
        let mut fields = Vec::new();

        if let Some(price) = &record.price {
            fields.push(EmbedField::new("Price", price));
        }

        if let Some(rating) = &record.rating {
            fields.push(EmbedField::new(
                "Rating",
                format!("⭐ {:.1} ({} reviews)", rating.stars, rating.review_count),
            ));
        }

        if record.member_eligible {
            fields.push(EmbedField::new("Shipping", "✓ Prime Eligible"));
        }

        if let Some(location) = &notification.location {
            fields.push(EmbedField::new("State", location));
        }

        let stock_change = match &notification.stock {
            Some(level) => level.summary(),
            None => record.availability.label().to_string(),
        };
        fields.push(EmbedField::new("Stock Change", stock_change));

        fields.push(EmbedField::new("Store", store));
        fields.push(EmbedField::new(notification.retailer.identifier_label(), &record.id));

        if self.marketplace_links {
            let (current, sold) = ebay_links(&record.title);
            fields.push(EmbedField::new(
                "eBay Links",
                format!("[Current Listings]({}) | [Sold Listings]({})", current, sold),
            ));
        }

        let description = match notification.kind {
            EventKind::New => None,
            EventKind::Restock => Some("Back in stock".to_string()),
        };

        let embed = Embed {
            title: record.title.chars().take(MAX_TITLE_CHARS).collect(),
            url: Some(record.url.trim()).filter(|url| !url.is_empty()).map(String::from),
            description,
            color: self.colour,
            fields,
            footer: EmbedFooter { text: format!("{} Stock Monitor", store) },
            timestamp: chrono::Utc::now().to_rfc3339(),
            thumbnail: record.image_url.clone().map(|url| EmbedThumbnail { url }),
        };

        WebhookPayload {
            username: self.username.clone(),
            avatar_url: self.avatar_url.clone(),
            embeds: vec![embed],
        }
    }
}

/// eBay AU searches for current Buy It Now listings and sold listings.
pub fn ebay_links(title: &str) -> (String, String) {
    let query = search_query(title);
    (
        format!("https://www.ebay.com.au/sch/i.html?_nkw={}&LH_BIN=1", query),
        format!("https://www.ebay.com.au/sch/i.html?_nkw={}&LH_Complete=1&LH_Sold=1", query),
    )
}

/// URL-encodes `title` as a search query, cut at a character boundary once
/// the encoded form would exceed `MAX_QUERY_LEN`.
fn search_query(title: &str) -> String {
    let mut query = String::new();
    let mut buf = [0u8; 4];

    for ch in title.trim().chars() {
        let encoded: Cow<str> = if ch == ' ' { Cow::Borrowed("+") } else { urlencoding::encode(ch.encode_utf8(&mut buf)) };
        if query.len() + encoded.len() > MAX_QUERY_LEN {
            break;
        }
        query.push_str(&encoded);
    }

    query.trim_end_matches('+').to_string()
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let payload = self.render(notification);
        let body = serde_json::to_string(&payload)?;
        let url = self.destination(notification);

        debug!("POST webhook for {}", notification.record.id);

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected { status: status.as_u16(), body });
        }

        info!(
            "Notification sent to {} webhook (HTTP {}): {}",
            notification.location.as_deref().unwrap_or("default"),
            status.as_u16(),
            notification.record.title
        );

        Ok(())
    }

    fn routes_location(&self, location: &str) -> bool {
        self.regions.contains_key(&location.to_uppercase())
    }
}
