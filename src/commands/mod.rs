//! CLI command implementations.

pub mod retailers;
pub mod run;
pub mod scrape;
pub mod webhook;

pub use retailers::list_retailers;
pub use run::RunCommand;
pub use scrape::ScrapeCommand;
pub use webhook::WebhookCommand;
