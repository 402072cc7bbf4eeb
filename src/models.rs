//! Data models for scraped products, ratings and per-location stock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A product as extracted from one retailer page during one cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Retailer identifier (ASIN, product code, SKU)
    pub id: String,
    /// Product title
    pub title: String,
    /// Canonical product URL
    pub url: String,
    /// Price as shown by the retailer (e.g. "$45.99")
    pub price: Option<String>,
    /// Availability as reported on the listing
    pub availability: Availability,
    /// Product image URL
    pub image_url: Option<String>,
    /// Rating and review information
    pub rating: Option<Rating>,
    /// Eligible for the retailer's membership shipping (Amazon Prime)
    pub member_eligible: bool,
    /// Product brand if available
    pub brand: Option<String>,
    /// Per-location stock quantities, empty when only presence is known
    #[serde(default)]
    pub stock: StockLevels,
}

impl ProductRecord {
    /// Creates a record with only the mandatory fields set.
    pub fn new(id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            url: url.into(),
            price: None,
            availability: Availability::Unknown,
            image_url: None,
            rating: None,
            member_eligible: false,
            brand: None,
            stock: StockLevels::new(),
        }
    }

    /// Returns the numeric price if the price string can be parsed.
    pub fn price_value(&self) -> Option<f64> {
        self.price.as_deref().and_then(parse_price)
    }

    /// Returns the star rating if available.
    pub fn stars(&self) -> Option<f32> {
        self.rating.as_ref().map(|r| r.stars)
    }

    /// True unless the listing is explicitly out of stock.
    pub fn is_available(&self) -> bool {
        self.availability != Availability::OutOfStock
    }
}

/// Parses a price like "$1,234.56" or "$10 - $20" into its first numeric value.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String =
        text.chars().filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',' || *c == '-').collect();

    // Ranges keep the lower bound
    let first = cleaned.split('-').map(str::trim).find(|part| !part.is_empty())?;

    first.replace(',', "").parse().ok()
}

/// Listing availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    InStock,
    OutOfStock,
    PreOrder,
    #[default]
    Unknown,
}

impl Availability {
    /// Label used in notifications and tables.
    pub fn label(&self) -> &'static str {
        match self {
            Availability::InStock => "In Stock",
            Availability::OutOfStock => "Out of Stock",
            Availability::PreOrder => "PreOrder",
            Availability::Unknown => "Available",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Product rating and review count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Star rating (0.0 - 5.0)
    pub stars: f32,
    /// Number of reviews
    pub review_count: u32,
}

impl Rating {
    /// Creates a new rating.
    pub fn new(stars: f32, review_count: u32) -> Self {
        Self { stars: stars.clamp(0.0, 5.0), review_count }
    }
}

/// Stock quantities at one location (state, store group or variant).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub online: u32,
    pub in_store: u32,
}

impl StockLevel {
    pub fn new(online: u32, in_store: u32) -> Self {
        Self { online, in_store }
    }

    pub fn has_stock(&self) -> bool {
        self.online > 0 || self.in_store > 0
    }

    /// True if either channel gained stock relative to `previous`.
    pub fn increased_from(&self, previous: &StockLevel) -> bool {
        self.online > previous.online || self.in_store > previous.in_store
    }

    /// Display form used in the "Stock Change" field.
    pub fn summary(&self) -> String {
        format!("Online: {}\nIn-Store: {}", self.online, self.in_store)
    }
}

/// Stock keyed by location label, ordered for stable output.
pub type StockLevels = BTreeMap<String, StockLevel>;

/// Sums all locations into one combined level, saturating at `u32::MAX`.
pub fn total_stock(levels: &StockLevels) -> StockLevel {
    levels.values().fold(StockLevel::default(), |acc, level| StockLevel {
        online: acc.online.saturating_add(level.online),
        in_store: acc.in_store.saturating_add(level.in_store),
    })
}

/// Locations in `current` that gained stock compared to `previous`.
///
/// A location missing from `previous` is compared against zero.
pub fn increased_locations(previous: &StockLevels, current: &StockLevels) -> Vec<(String, StockLevel)> {
    current
        .iter()
        .filter(|(location, level)| {
            let before = previous.get(*location).copied().unwrap_or_default();
            level.increased_from(&before)
        })
        .map(|(location, level)| (location.clone(), *level))
        .collect()
}

/// Locations that currently hold any stock.
pub fn stocked_locations(levels: &StockLevels) -> Vec<(String, StockLevel)> {
    levels
        .iter()
        .filter(|(_, level)| level.has_stock())
        .map(|(location, level)| (location.clone(), *level))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_levels(entries: &[(&str, u32, u32)]) -> StockLevels {
        entries
            .iter()
            .map(|(loc, online, in_store)| (loc.to_string(), StockLevel::new(*online, *in_store)))
            .collect()
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("$29.99"), Some(29.99));
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price("AU$45"), Some(45.0));
        assert_eq!(parse_price("$10 - $20"), Some(10.0));
        assert_eq!(parse_price("N/A"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_record_new_minimal() {
        let record = ProductRecord::new("123", "Booster Box", "https://example.com/p/123");
        assert_eq!(record.id, "123");
        assert!(record.price.is_none());
        assert!(record.image_url.is_none());
        assert!(record.stock.is_empty());
        assert_eq!(record.availability, Availability::Unknown);
        assert!(record.is_available());
    }

    #[test]
    fn test_price_value() {
        let mut record = ProductRecord::new("1", "Tin", "u");
        assert_eq!(record.price_value(), None);

        record.price = Some("$19.00".to_string());
        assert_eq!(record.price_value(), Some(19.0));

        record.price = Some("See price in cart".to_string());
        assert_eq!(record.price_value(), None);
    }

    #[test]
    fn test_availability_labels() {
        assert_eq!(Availability::InStock.to_string(), "In Stock");
        assert_eq!(Availability::OutOfStock.to_string(), "Out of Stock");
        assert_eq!(Availability::PreOrder.to_string(), "PreOrder");
        assert_eq!(Availability::Unknown.to_string(), "Available");
    }

    #[test]
    fn test_out_of_stock_not_available() {
        let mut record = ProductRecord::new("1", "Tin", "u");
        record.availability = Availability::OutOfStock;
        assert!(!record.is_available());

        record.availability = Availability::PreOrder;
        assert!(record.is_available());
    }

    #[test]
    fn test_rating_clamping() {
        assert_eq!(Rating::new(6.0, 10).stars, 5.0);
        assert_eq!(Rating::new(-1.0, 10).stars, 0.0);
        assert_eq!(Rating::new(4.5, 10).stars, 4.5);
    }

    #[test]
    fn test_total_stock() {
        let levels = make_levels(&[("NSW", 3, 1), ("VIC", 0, 4)]);
        assert_eq!(total_stock(&levels), StockLevel::new(3, 5));
        assert_eq!(total_stock(&StockLevels::new()), StockLevel::default());
    }

    #[test]
    fn test_total_stock_saturates() {
        let levels = make_levels(&[("NSW", u32::MAX, 2), ("VIC", 5, u32::MAX)]);
        assert_eq!(total_stock(&levels), StockLevel::new(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_increased_locations() {
        let before = make_levels(&[("NSW", 3, 1), ("VIC", 2, 2)]);
        let after = make_levels(&[("NSW", 3, 1), ("VIC", 1, 5), ("QLD", 1, 0)]);

        let increased = increased_locations(&before, &after);
        let names: Vec<_> = increased.iter().map(|(loc, _)| loc.as_str()).collect();
        assert_eq!(names, vec!["QLD", "VIC"]);
    }

    #[test]
    fn test_new_location_without_stock_is_not_an_increase() {
        let after = make_levels(&[("WA", 0, 0)]);
        assert!(increased_locations(&StockLevels::new(), &after).is_empty());
    }

    #[test]
    fn test_stocked_locations() {
        let levels = make_levels(&[("NSW", 0, 0), ("SA", 0, 2)]);
        let stocked = stocked_locations(&levels);
        assert_eq!(stocked.len(), 1);
        assert_eq!(stocked[0].0, "SA");
    }

    #[test]
    fn test_stock_summary() {
        assert_eq!(StockLevel::new(4, 7).summary(), "Online: 4\nIn-Store: 7");
    }

    #[test]
    fn test_record_serde() {
        let mut record = ProductRecord::new("B0TEST", "Elite Trainer Box", "https://x/dp/B0TEST");
        record.price = Some("$69.00".to_string());
        record.stock.insert("NSW".to_string(), StockLevel::new(1, 0));

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("B0TEST"));
        assert!(json.contains("\"unknown\""));

        let parsed: ProductRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }
}
