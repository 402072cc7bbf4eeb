//! In-stock-only filter.

use super::Filter;
use crate::models::ProductRecord;

/// Drops listings marked out of stock. Preorders and unknown status pass.
#[derive(Default)]
pub struct StockFilter;

impl StockFilter {
    pub fn new() -> Self {
        Self
    }
}

impl Filter for StockFilter {
    fn matches(&self, product: &ProductRecord) -> bool {
        product.is_available()
    }

    fn description(&self) -> String {
        "In stock only".to_string()
    }
}
