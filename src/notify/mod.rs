//! Outbound notifications for new and restocked products.

pub mod discord;

pub use discord::DiscordNotifier;

use crate::error::NotifyError;
use crate::models::{total_stock, Availability, ProductRecord, StockLevel};
use crate::retailers::Retailer;
use async_trait::async_trait;

/// Why a product is being announced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// First seen since the monitor primed
    New,
    /// Already tracked and gained stock
    Restock,
}

impl EventKind {
    /// Log prefix for the event.
    pub fn tag(&self) -> &'static str {
        match self {
            EventKind::New => "[NEW]",
            EventKind::Restock => "[RESTOCK]",
        }
    }
}

/// A single message to deliver. Owns its data so it can be sent from a
/// detached task.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub retailer: Retailer,
    pub kind: EventKind,
    pub record: ProductRecord,
    /// Location this message is about, for regional routing
    pub location: Option<String>,
    /// Stock shown in the message, if known
    pub stock: Option<StockLevel>,
}

impl Notification {
    /// Message for the main channel with stock combined across locations.
    pub fn new(retailer: Retailer, kind: EventKind, record: ProductRecord) -> Self {
        let stock = (!record.stock.is_empty()).then(|| total_stock(&record.stock));
        Self { retailer, kind, record, location: None, stock }
    }

    /// Message about one location's stock.
    pub fn for_location(
        retailer: Retailer,
        kind: EventKind,
        record: ProductRecord,
        location: impl Into<String>,
        stock: StockLevel,
    ) -> Self {
        Self { retailer, kind, record, location: Some(location.into()), stock: Some(stock) }
    }

    /// Sample message used to check webhook delivery.
    pub fn sample(retailer: Retailer) -> Self {
        let mut record = ProductRecord::new(
            "TEST-0001",
            "TEST - Pokemon TCG Scarlet & Violet Elite Trainer Box [TEST NOTIFICATION]",
            retailer.default_url().unwrap_or("https://example.com/products/test"),
        );
        record.price = Some("$79.00".to_string());
        record.availability = Availability::InStock;
        record.member_eligible = retailer == Retailer::Amazon;

        Self::new(retailer, EventKind::New, record)
    }
}

/// Delivers notifications to an external channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;

    /// True if messages about `location` have a dedicated destination.
    fn routes_location(&self, _location: &str) -> bool {
        false
    }
}
