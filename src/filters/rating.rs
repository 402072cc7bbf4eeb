//! Minimum rating filter.

use super::Filter;
use crate::models::{ProductRecord, Rating};

/// Filters products by minimum star rating.
pub struct RatingFilter {
    min_stars: f32,
}

impl RatingFilter {
    /// Creates a new rating filter with minimum stars.
    pub fn new(min_stars: f32) -> Self {
        Self { min_stars: min_stars.clamp(0.0, 5.0) }
    }
}

impl Filter for RatingFilter {
    fn matches(&self, product: &ProductRecord) -> bool {
        // Unrated products pass
        product.stars().map_or(true, |stars| stars >= self.min_stars)
    }

    fn description(&self) -> String {
        format!("Rating: >= {:.1} stars", self.min_stars)
    }
}
