//! Supported retailers and their storefront defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Retailers with a dedicated extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Retailer {
    #[default]
    Amazon,
    BigW,
    EbGames,
    Kmart,
    Target,
    Shopify,
}

impl Retailer {
    /// Store name shown in notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            Retailer::Amazon => "Amazon AU",
            Retailer::BigW => "Big W",
            Retailer::EbGames => "EB Games",
            Retailer::Kmart => "Kmart",
            Retailer::Target => "Target AU",
            Retailer::Shopify => "Shopify",
        }
    }

    /// Storefront origin used to absolutize relative links.
    pub fn base_url(&self) -> &'static str {
        match self {
            Retailer::Amazon => "https://www.amazon.com.au",
            Retailer::BigW => "https://www.bigw.com.au",
            Retailer::EbGames => "https://www.ebgames.com.au",
            Retailer::Kmart => "https://www.kmart.com.au",
            Retailer::Target => "https://www.target.com.au",
            Retailer::Shopify => "",
        }
    }

    /// Page monitored when no URL is configured.
    pub fn default_url(&self) -> Option<&'static str> {
        match self {
            Retailer::Amazon => Some("https://www.amazon.com.au/s?k=pokemon+cards"),
            Retailer::BigW => {
                Some("https://www.bigw.com.au/toys/trading-cards/pokemon-trading-cards/c/681510201")
            }
            Retailer::EbGames => Some(
                "https://www.ebgames.com.au/search?category=toys-hobbies&subcategory=toys-hobbies-trading-cards&attributes=franchise%3Apokemon",
            ),
            Retailer::Kmart => Some("https://www.kmart.com.au/category/toys/pokemon-trading-cards/"),
            Retailer::Target => Some("https://www.target.com.au/search?sEngine=c&text=pokemon+cards"),
            Retailer::Shopify => None,
        }
    }

    /// Label of the identifier field in notifications.
    pub fn identifier_label(&self) -> &'static str {
        match self {
            Retailer::Amazon => "ASIN",
            Retailer::BigW | Retailer::EbGames => "Product Code",
            Retailer::Kmart => "SKU",
            Retailer::Target | Retailer::Shopify => "Product ID",
        }
    }

    /// Brand colour used for the embed accent.
    pub fn colour(&self) -> u32 {
        match self {
            Retailer::Amazon => 0xFF9900,
            Retailer::BigW => 0xFF0000,
            Retailer::EbGames => 0xE32526,
            Retailer::Kmart => 0x3498DB,
            Retailer::Target => 0xFF0000,
            Retailer::Shopify => 0x95BF47,
        }
    }

    /// Default seconds between cycles. Amazon blocks aggressively.
    pub fn default_poll_secs(&self) -> u64 {
        match self {
            Retailer::Amazon | Retailer::EbGames => 60,
            _ => 30,
        }
    }

    /// Returns all supported retailers.
    pub fn all() -> &'static [Retailer] {
        &[
            Retailer::Amazon,
            Retailer::BigW,
            Retailer::EbGames,
            Retailer::Kmart,
            Retailer::Target,
            Retailer::Shopify,
        ]
    }
}

impl fmt::Display for Retailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Retailer::Amazon => "amazon",
            Retailer::BigW => "bigw",
            Retailer::EbGames => "ebgames",
            Retailer::Kmart => "kmart",
            Retailer::Target => "target",
            Retailer::Shopify => "shopify",
        };
        write!(f, "{}", code)
    }
}

impl FromStr for Retailer {
    type Err = RetailerParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amazon" | "amazon-au" | "amz" => Ok(Retailer::Amazon),
            "bigw" | "big-w" | "big w" => Ok(Retailer::BigW),
            "ebgames" | "eb-games" | "eb games" | "eb" => Ok(Retailer::EbGames),
            "kmart" => Ok(Retailer::Kmart),
            "target" => Ok(Retailer::Target),
            "shopify" => Ok(Retailer::Shopify),
            _ => Err(RetailerParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetailerParseError(String);

impl fmt::Display for RetailerParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown retailer '{}'. Valid retailers: amazon, bigw, ebgames, kmart, target, shopify",
            self.0
        )
    }
}

impl std::error::Error for RetailerParseError {}
