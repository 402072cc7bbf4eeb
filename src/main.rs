//! stock-monitor - Australian retailer stock monitor with Discord alerts
//!
//! Uses TLS fingerprint emulation for reliable scraping.

use anyhow::{Context, Result};
use au_stock_monitor::commands::{list_retailers, RunCommand, ScrapeCommand, WebhookCommand};
use au_stock_monitor::config::{Config, OutputFormat};
use au_stock_monitor::retailers::Retailer;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "stock-monitor",
    version,
    about = "Stock monitor for Australian retailers with Discord alerts",
    long_about = "Polls Amazon AU, Big W, EB Games, Kmart, Target or a Shopify store and posts new and restocked products to a Discord webhook."
)]
struct Cli {
    /// Retailer to monitor
    #[arg(short, long, global = true, env = "MONITOR_RETAILER")]
    retailer: Option<Retailer>,

    /// Page to monitor instead of the retailer default
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Discord webhook URL
    #[arg(long, global = true, env = "MONITOR_WEBHOOK", hide_env_values = true)]
    webhook: Option<String>,

    /// Proxy URLs, rotated on failure (comma-separated)
    #[arg(long, global = true, env = "MONITOR_PROXY", value_delimiter = ',')]
    proxy: Option<Vec<String>>,

    /// Seconds between monitor cycles
    #[arg(long, global = true, env = "MONITOR_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor until Ctrl-C, posting new and restocked products
    #[command(alias = "r")]
    Run,

    /// Scrape once and print the filtered products
    #[command(alias = "s")]
    Scrape {
        /// Search terms to scrape instead of the listing page
        terms: Vec<String>,

        /// Pages to fetch per source
        #[arg(short, long)]
        pages: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,

        /// Required keywords in title (comma-separated)
        #[arg(long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,

        /// Excluded keywords from title (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Option<Vec<String>>,

        /// Minimum price filter
        #[arg(long)]
        min_price: Option<f64>,

        /// Maximum price filter
        #[arg(long)]
        max_price: Option<f64>,

        /// Include out-of-stock listings
        #[arg(long)]
        all: bool,
    },

    /// Send a test notification to the configured webhooks
    #[command(name = "test-webhook", alias = "t")]
    TestWebhook,

    /// List supported retailers
    Retailers,
}

/// Sets up console logging plus an optional plain-text log file. The
/// returned guard must live until exit so buffered lines are flushed.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = if verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()))
    };

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path.file_name().context("log_file has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    if let Some(retailer) = cli.retailer {
        config.retailer = retailer;
    }
    if let Some(url) = cli.url {
        config.url = Some(url);
    }
    if let Some(webhook) = cli.webhook {
        config.webhook.url = Some(webhook);
    }
    if let Some(proxies) = cli.proxy {
        config.proxies = proxies;
    }
    if let Some(delay) = cli.delay {
        config.poll_delay_secs = Some(delay);
    }
    if let Some(log_file) = cli.log_file {
        config.log_file = Some(log_file);
    }

    let _guard = init_logging(cli.verbose, config.log_file.as_deref())?;

    match cli.command {
        Commands::Run => {
            RunCommand::new(config).execute().await?;
        }

        Commands::Scrape { terms, pages, format, keywords, exclude, min_price, max_price, all } => {
            // Apply scrape-specific config
            config.format = format;
            if !terms.is_empty() {
                config.search_terms = terms;
            }
            if let Some(pages) = pages {
                config.max_pages = pages;
            }
            if let Some(kw) = keywords {
                config.keywords = kw;
            }
            if let Some(ex) = exclude {
                config.exclude_keywords = ex;
            }
            if min_price.is_some() {
                config.min_price = min_price;
            }
            if max_price.is_some() {
                config.max_price = max_price;
            }
            if all {
                config.in_stock_only = false;
            }

            let output = ScrapeCommand::new(config).execute().await?;
            println!("{}", output);
        }

        Commands::TestWebhook => {
            let output = WebhookCommand::new(config).execute().await?;
            println!("{}", output);
        }

        Commands::Retailers => {
            println!("{}", list_retailers());
        }
    }

    Ok(())
}
