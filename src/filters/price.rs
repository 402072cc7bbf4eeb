//! Price range filter.

use super::Filter;
use crate::models::ProductRecord;

/// Filters products by price range.
pub struct PriceFilter {
    min: Option<f64>,
    max: Option<f64>,
}

impl PriceFilter {
    /// Creates a new price filter with optional min/max bounds.
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    /// Creates a filter with both min and max.
    pub fn range(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }
}

impl Filter for PriceFilter {
    fn matches(&self, product: &ProductRecord) -> bool {
        // Missing or unreadable prices pass
        let Some(price) = product.price_value() else {
            return true;
        };

        if self.min.is_some_and(|min| price < min) {
            return false;
        }

        !self.max.is_some_and(|max| price > max)
    }

    fn description(&self) -> String {
        match (self.min, self.max) {
            (Some(min), Some(max)) => format!("Price: ${:.2} - ${:.2}", min, max),
            (Some(min), None) => format!("Price: >= ${:.2}", min),
            (None, Some(max)) => format!("Price: <= ${:.2}", max),
            (None, None) => "Price: any".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_product(price: Option<&str>) -> ProductRecord {
        let mut record = ProductRecord::new("TEST", "Test", "https://example.com/p/TEST");
        record.price = price.map(String::from);
        record
    }

    #[test]
    fn test_price_range() {
        let filter = PriceFilter::range(10.0, 50.0);

        assert!(!filter.matches(&make_product(Some("$5.00"))));
        assert!(filter.matches(&make_product(Some("$10.00"))));
        assert!(filter.matches(&make_product(Some("$49.99"))));
        assert!(filter.matches(&make_product(Some("$50"))));
        assert!(!filter.matches(&make_product(Some("$1,050.00"))));
    }

    #[test]
    fn test_min_only() {
        let filter = PriceFilter::new(Some(20.0), None);
        assert!(!filter.matches(&make_product(Some("$19.99"))));
        assert!(filter.matches(&make_product(Some("$999"))));
    }

    #[test]
    fn test_max_only() {
        let filter = PriceFilter::new(None, Some(50.0));
        assert!(filter.matches(&make_product(Some("$0.50"))));
        assert!(!filter.matches(&make_product(Some("$50.01"))));
    }

    #[test]
    fn test_missing_or_unparsable_price_passes() {
        let filter = PriceFilter::range(10.0, 50.0);
        assert!(filter.matches(&make_product(None)));
        assert!(filter.matches(&make_product(Some("N/A"))));
        assert!(filter.matches(&make_product(Some("See price in cart"))));
    }

    #[test]
    fn test_description() {
        assert_eq!(PriceFilter::range(10.0, 50.0).description(), "Price: $10.00 - $50.00");
        assert_eq!(PriceFilter::new(Some(5.0), None).description(), "Price: >= $5.00");
        assert_eq!(PriceFilter::new(None, Some(5.0)).description(), "Price: <= $5.00");
        assert_eq!(PriceFilter::new(None, None).description(), "Price: any");
    }
}
