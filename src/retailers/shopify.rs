//! Generic Shopify storefront extraction from `products.json`.

use super::{with_page_param, Extraction, Extractor, Retailer};
use crate::error::ExtractError;
use crate::models::{Availability, ProductRecord, StockLevel};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

#[derive(Debug, Deserialize)]
struct ProductsPage {
    products: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ShopifyProduct {
    id: u64,
    title: String,
    handle: String,
    #[serde(default)]
    vendor: Option<String>,
    #[serde(default)]
    variants: Vec<Variant>,
    #[serde(default)]
    images: Vec<ShopifyImage>,
}

#[derive(Debug, Deserialize)]
struct Variant {
    #[serde(default)]
    title: String,
    #[serde(default)]
    available: bool,
    #[serde(default)]
    price: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ShopifyImage {
    src: String,
}

/// Extracts products from a Shopify store's `products.json` feed.
///
/// Each variant (size, edition) becomes a stock location so that a variant
/// coming back into stock reads as a stock increase.
#[derive(Debug)]
pub struct ShopifyExtractor {
    product_base: String,
}

impl ShopifyExtractor {
    /// `feed_url` is the store's `.../products.json` URL.
    pub fn new(feed_url: &str) -> Self {
        let without_query = feed_url.split('?').next().unwrap_or(feed_url);
        let product_base = match without_query.strip_suffix(".json") {
            Some(stem) => format!("{}/", stem),
            None => format!("{}/products/", without_query.trim_end_matches('/')),
        };
        Self { product_base }
    }

    fn to_record(&self, product: ShopifyProduct) -> Option<ProductRecord> {
        let title = product.title.trim();
        if title.is_empty() || product.handle.is_empty() {
            return None;
        }

        let url = format!("{}{}", self.product_base, product.handle);
        let mut record = ProductRecord::new(product.id.to_string(), title, url);

        record.brand = product.vendor.filter(|v| !v.is_empty());
        record.image_url = product.images.into_iter().next().map(|image| image.src);

        let available: Vec<&Variant> = product.variants.iter().filter(|v| v.available).collect();

        record.price = available
            .first()
            .copied()
            .or_else(|| product.variants.first())
            .and_then(|variant| variant.price.as_deref())
            .map(|price| format!("${}", price));

        record.availability =
            if available.is_empty() { Availability::OutOfStock } else { Availability::InStock };

        for variant in &product.variants {
            let label = if variant.title.is_empty() { "Default Title" } else { variant.title.as_str() };
            record.stock.insert(label.to_string(), StockLevel::new(u32::from(variant.available), 0));
        }

        Some(record)
    }
}

impl Extractor for ShopifyExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::Shopify
    }

    fn page_url(&self, base: &str, page: u32) -> Option<String> {
        if page <= 1 {
            return Some(base.to_string());
        }
        Some(with_page_param(base, page))
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let page: ProductsPage = serde_json::from_str(raw).map_err(|e| {
            if raw.trim_start().starts_with('<') {
                ExtractError::MissingStructure("products.json returned HTML".to_string())
            } else {
                ExtractError::Malformed(format!("products.json: {}", e))
            }
        })?;

        let mut extraction = Extraction::default();

        for item in page.products {
            let record = serde_json::from_value::<ShopifyProduct>(item)
                .ok()
                .and_then(|product| self.to_record(product));

            match record {
                Some(record) => {
                    trace!("Parsed product: {} - {}", record.id, record.title);
                    extraction.records.push(record);
                }
                None => extraction.skipped += 1,
            }
        }

        extraction.has_more = !extraction.records.is_empty();

        debug!("Parsed {} Shopify products ({} skipped)", extraction.records.len(), extraction.skipped);

        Ok(extraction)
    }
}
