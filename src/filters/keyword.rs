//! Keyword-based title filtering.

use super::Filter;
use crate::models::ProductRecord;

/// Filters products by case-insensitive keywords in the title.
///
/// A title containing any excluded keyword is rejected even if it also
/// matches an include keyword. An empty include list accepts every title
/// that is not excluded.
pub struct KeywordFilter {
    /// At least one of these must appear in the title.
    include: Vec<String>,
    /// None of these may appear in the title.
    exclude: Vec<String>,
}

impl KeywordFilter {
    /// Creates a new keyword filter.
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include: normalize(include), exclude: normalize(exclude) }
    }

    /// Creates a filter that accepts titles containing any of `keywords`.
    pub fn any(keywords: Vec<String>) -> Self {
        Self::new(keywords, Vec::new())
    }

    /// Creates a filter with only excluded keywords.
    pub fn excluded(keywords: Vec<String>) -> Self {
        Self::new(Vec::new(), keywords)
    }
}

fn normalize(keywords: Vec<String>) -> Vec<String> {
    keywords
        .into_iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

impl Filter for KeywordFilter {
    fn matches(&self, product: &ProductRecord) -> bool {
        let title = product.title.to_lowercase();

        if self.exclude.iter().any(|keyword| title.contains(keyword)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|keyword| title.contains(keyword))
    }

    fn description(&self) -> String {
        let mut parts = Vec::new();

        if !self.include.is_empty() {
            parts.push(format!("Contains any of: {}", self.include.join(", ")));
        }

        if !self.exclude.is_empty() {
            parts.push(format!("Must not contain: {}", self.exclude.join(", ")));
        }

        if parts.is_empty() {
            "Keywords: any".to_string()
        } else {
            parts.join("; ")
        }
    }
}
