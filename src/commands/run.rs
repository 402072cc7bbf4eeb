//! The long-running monitor command.

use crate::config::Config;
use crate::fetch::HttpFetcher;
use crate::monitor::{Monitor, StatsSnapshot};
use crate::notify::DiscordNotifier;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct RunCommand {
    config: Config,
}

impl RunCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Validates the configuration, then monitors until Ctrl-C.
    pub async fn execute(&self) -> Result<StatsSnapshot> {
        self.config.validate().context("Invalid configuration")?;

        let fetcher = HttpFetcher::new(&self.config).context("Failed to create HTTP client")?;
        if fetcher.pool_size() > 1 {
            info!("Rotating across {} proxies", fetcher.pool_size());
        }

        let notifier = DiscordNotifier::new(self.config.retailer, &self.config.webhook)
            .context("Failed to create webhook client")?;

        let mut monitor = Monitor::from_config(&self.config, Arc::new(fetcher), Arc::new(notifier))
            .context("Invalid configuration")?;

        info!(
            "{} Stock Monitor started (priming: {})",
            self.config.retailer.display_name(),
            self.config.priming
        );

        Ok(monitor.run().await)
    }
}
