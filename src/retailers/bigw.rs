//! Big W category extraction from the embedded `__NEXT_DATA__` JSON.

use super::selectors::bigw as sel;
use super::{Extraction, Extractor, Retailer};
use crate::error::ExtractError;
use crate::models::{Availability, ProductRecord};
use scraper::Html;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

const ORIGIN: &str = "https://www.bigw.com.au";
const RESULTS_POINTER: &str = "/props/pageProps/results/organic/results";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BigWProduct {
    code: Option<String>,
    information: Information,
    derived: Derived,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Information {
    name: Option<String>,
    brand: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Derived {
    stock: bool,
    sold_out: bool,
    price_range: PriceRange,
    media: Media,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceRange {
    min: Amount,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Amount {
    /// Price in cents
    amount: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Media {
    images: Vec<Image>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Image {
    large_img: ImageUrl,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageUrl {
    url: Option<String>,
}

/// Extracts products from Big W listing pages.
#[derive(Debug, Default)]
pub struct BigWExtractor;

impl BigWExtractor {
    pub fn new() -> Self {
        Self
    }

    fn to_record(&self, product: BigWProduct) -> Option<ProductRecord> {
        let code = product.code.filter(|c| !c.trim().is_empty())?;
        let name = product.information.name.filter(|n| !n.trim().is_empty())?;

        let url = format!("{}/product/{}/p/{}", ORIGIN, slugify(&name), code);
        let mut record = ProductRecord::new(code, name, url);

        record.brand = product.information.brand.filter(|b| !b.is_empty());

        let cents = product.derived.price_range.min.amount;
        if cents > 0 {
            record.price = Some(format!("${}.{:02}", cents / 100, cents % 100));
        }

        record.image_url = product
            .derived
            .media
            .images
            .into_iter()
            .next()
            .and_then(|image| image.large_img.url)
            .filter(|path| !path.is_empty())
            .map(|path| format!("{}{}", ORIGIN, path));

        record.availability = if product.derived.stock && !product.derived.sold_out {
            Availability::InStock
        } else {
            Availability::OutOfStock
        };

        Some(record)
    }
}

/// Builds the URL slug Big W uses for product pages.
fn slugify(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace([':', ','], "")
}

impl Extractor for BigWExtractor {
    fn retailer(&self) -> Retailer {
        Retailer::BigW
    }

    fn extract(&self, raw: &str) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(raw);

        let script = document
            .select(&sel::NEXT_DATA)
            .next()
            .ok_or_else(|| ExtractError::MissingStructure("__NEXT_DATA__ script".to_string()))?;

        let data: Value = serde_json::from_str(&script.text().collect::<String>())
            .map_err(|e| ExtractError::Malformed(format!("__NEXT_DATA__: {}", e)))?;

        let results = data
            .pointer(RESULTS_POINTER)
            .and_then(Value::as_array)
            .ok_or_else(|| ExtractError::MissingStructure(RESULTS_POINTER.to_string()))?;

        let mut extraction = Extraction::default();

        for item in results {
            let record = serde_json::from_value::<BigWProduct>(item.clone())
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

        debug!("Parsed {} Big W products ({} skipped)", extraction.records.len(), extraction.skipped);

        Ok(extraction)
    }
}
