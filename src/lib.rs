//! au-stock-monitor - stock monitors for Australian retailers
//!
//! Scrapes retailer listings with TLS fingerprint emulation, filters and
//! diffs them against the previous scrape, and posts new or restocked
//! products to Discord.

pub mod commands;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filters;
pub mod format;
pub mod models;
pub mod monitor;
pub mod notify;
pub mod retailers;
pub mod tracker;

pub use config::Config;
pub use models::{Availability, ProductRecord, Rating, StockLevel, StockLevels};
pub use monitor::{CycleOutcome, Monitor};
pub use retailers::{AuState, Retailer};
