//! Sends sample notifications to check webhook setup.

use crate::config::Config;
use crate::models::StockLevel;
use crate::notify::{DiscordNotifier, EventKind, Notification, Notifier};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

pub struct WebhookCommand {
    config: Config,
}

impl WebhookCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Posts a sample to the main webhook and one per regional webhook.
    pub async fn execute(&self) -> Result<String> {
        self.config.validate_webhook().context("Invalid webhook configuration")?;

        let notifier = DiscordNotifier::new(self.config.retailer, &self.config.webhook)
            .context("Failed to create webhook client")?;
        self.execute_with_notifier(Arc::new(notifier)).await
    }

    /// Sends the samples through a provided notifier (for testing).
    pub async fn execute_with_notifier(&self, notifier: Arc<dyn Notifier>) -> Result<String> {
        let retailer = self.config.retailer;
        let mut lines = Vec::new();

        let sample = Notification::sample(retailer);
        notifier.notify(&sample).await.context("Test notification to the main webhook failed")?;
        lines.push(format!("✓ Sent test notification for {} to the main webhook", retailer.display_name()));

        for region in self.config.webhook.regions.keys() {
            if !notifier.routes_location(region) {
                continue;
            }

            info!("Sending test notification to {} webhook", region);
            let regional = Notification::for_location(
                retailer,
                EventKind::New,
                sample.record.clone(),
                region.to_uppercase(),
                StockLevel::new(1, 1),
            );
            notifier
                .notify(&regional)
                .await
                .with_context(|| format!("Test notification to the {} webhook failed", region))?;
            lines.push(format!("✓ Sent test notification to the {} webhook", region));
        }

        Ok(lines.join("\n"))
    }
}
