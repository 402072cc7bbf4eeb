//! Product filtering system with composable filters.

pub mod keyword;
pub mod member;
pub mod price;
pub mod rating;
pub mod stock;

use crate::config::Config;
use crate::models::ProductRecord;

pub use keyword::KeywordFilter;
pub use member::MemberFilter;
pub use price::PriceFilter;
pub use rating::RatingFilter;
pub use stock::StockFilter;

/// Trait for filtering products.
pub trait Filter: Send + Sync {
    /// Returns true if the product passes the filter.
    fn matches(&self, product: &ProductRecord) -> bool;

    /// Returns a description of this filter.
    fn description(&self) -> String;
}

/// A chain of filters that must all pass.
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    /// Creates an empty filter chain.
    pub fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Builds the chain described by the configuration.
    pub fn from_config(config: &Config) -> Self {
        FilterChainBuilder::new()
            .keywords(config.keywords.clone())
            .include_exclude(config.include_keywords.clone(), config.exclude_keywords.clone())
            .price_range(config.min_price, config.max_price)
            .min_rating(config.min_rating)
            .in_stock_only(config.in_stock_only)
            .member_only(config.member_only)
            .build()
    }

    /// Adds a filter to the chain.
    pub fn add(&mut self, filter: impl Filter + 'static) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Checks if a product passes all filters.
    pub fn matches(&self, product: &ProductRecord) -> bool {
        self.filters.iter().all(|f| f.matches(product))
    }

    /// Filters a collection of products, keeping their order.
    pub fn apply(&self, products: Vec<ProductRecord>) -> Vec<ProductRecord> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns descriptions of all filters.
    pub fn descriptions(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.description()).collect()
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing a FilterChain from configuration.
pub struct FilterChainBuilder {
    chain: FilterChain,
}

impl FilterChainBuilder {
    pub fn new() -> Self {
        Self { chain: FilterChain::new() }
    }

    /// Requires any of `keywords` in the title.
    pub fn keywords(mut self, keywords: Vec<String>) -> Self {
        if !keywords.is_empty() {
            self.chain.add(KeywordFilter::any(keywords));
        }
        self
    }

    /// Requires any of `include` (if given) and none of `exclude`.
    pub fn include_exclude(mut self, include: Vec<String>, exclude: Vec<String>) -> Self {
        if !include.is_empty() || !exclude.is_empty() {
            self.chain.add(KeywordFilter::new(include, exclude));
        }
        self
    }

    /// Adds a price range filter.
    pub fn price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if min.is_some() || max.is_some() {
            self.chain.add(PriceFilter::new(min, max));
        }
        self
    }

    /// Adds a minimum rating filter.
    pub fn min_rating(mut self, min: Option<f32>) -> Self {
        if let Some(min) = min {
            self.chain.add(RatingFilter::new(min));
        }
        self
    }

    /// Drops listings marked out of stock.
    pub fn in_stock_only(mut self, enabled: bool) -> Self {
        if enabled {
            self.chain.add(StockFilter::new());
        }
        self
    }

    /// Keeps only Prime-eligible listings.
    pub fn member_only(mut self, enabled: bool) -> Self {
        if enabled {
            self.chain.add(MemberFilter::new());
        }
        self
    }

    pub fn build(self) -> FilterChain {
        self.chain
    }
}

impl Default for FilterChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}
