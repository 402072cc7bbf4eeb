//! Output formatting for scraped products (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::models::{total_stock, ProductRecord};
use crate::retailers::Retailer;

/// Formats products for output.
pub struct Formatter {
    format: OutputFormat,
    retailer: Retailer,
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat, retailer: Retailer) -> Self {
        Self { format, retailer }
    }

    /// Formats multiple products.
    pub fn format_products(&self, products: &[ProductRecord]) -> String {
        if products.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_header(),
                _ => "No products found.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => self.json_products(products),
            OutputFormat::Table => self.table_products(products),
            OutputFormat::Markdown => self.markdown_products(products),
            OutputFormat::Csv => self.csv_products(products),
        }
    }

    // JSON formatting

    fn json_products(&self, products: &[ProductRecord]) -> String {
        serde_json::to_string_pretty(products).unwrap_or_else(|_| "[]".to_string())
    }

    // Table formatting

    fn table_products(&self, products: &[ProductRecord]) -> String {
        let id_width = 12;
        let price_width = 10;
        let status_width = 14;
        let stock_width = 9;
        let title_width = 50;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<id_width$}  {:<price_width$}  {:<status_width$}  {:<stock_width$}  {}",
            self.retailer.identifier_label(),
            "Price",
            "Status",
            "Stock",
            "Title"
        ));
        lines.push(format!(
            "{:-<id_width$}  {:-<price_width$}  {:-<status_width$}  {:-<stock_width$}  {:-<title_width$}",
            "", "", "", "", ""
        ));

        for product in products {
            lines.push(format!(
                "{:<id_width$}  {:>price_width$}  {:<status_width$}  {:>stock_width$}  {}",
                product.id,
                product.price.as_deref().unwrap_or("N/A"),
                product.availability.label(),
                stock_cell(product),
                truncate(&product.title, title_width)
            ));
        }

        lines.push(String::new());
        lines.push(format!("Total: {} products", products.len()));

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_products(&self, products: &[ProductRecord]) -> String {
        let mut lines = Vec::new();

        lines.push(format!("| {} | Price | Status | Stock | Title |", self.retailer.identifier_label()));
        lines.push("|------|-------|--------|-------|-------|".to_string());

        for product in products {
            lines.push(format!(
                "| {} | {} | {} | {} | [{}]({}) |",
                product.id,
                product.price.as_deref().unwrap_or("N/A"),
                product.availability.label(),
                stock_cell(product),
                truncate(&product.title, 40).replace('|', "\\|"),
                product.url
            ));
        }

        lines.push(String::new());
        lines.push(format!("*{} products found at {}*", products.len(), self.retailer.display_name()));

        lines.join("\n")
    }

    // CSV formatting

    fn csv_header(&self) -> String {
        "id,title,price,availability,rating,reviews,member_eligible,online,in_store,brand,url".to_string()
    }

    fn csv_products(&self, products: &[ProductRecord]) -> String {
        let mut lines = Vec::new();
        lines.push(self.csv_header());

        for product in products {
            let rating = product.rating.as_ref().map(|r| r.stars.to_string()).unwrap_or_default();
            let reviews = product.rating.as_ref().map(|r| r.review_count.to_string()).unwrap_or_default();

            let (online, in_store) = if product.stock.is_empty() {
                (String::new(), String::new())
            } else {
                let total = total_stock(&product.stock);
                (total.online.to_string(), total.in_store.to_string())
            };

            lines.push(format!(
                "{},{},{},{},{},{},{},{},{},{},{}",
                Self::csv_escape(&product.id),
                Self::csv_escape(&product.title),
                product.price.as_deref().map(Self::csv_escape).unwrap_or_default(),
                product.availability,
                rating,
                reviews,
                product.member_eligible,
                online,
                in_store,
                product.brand.as_deref().map(Self::csv_escape).unwrap_or_default(),
                product.url
            ));
        }

        lines.join("\n")
    }

    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn stock_cell(product: &ProductRecord) -> String {
    if product.stock.is_empty() {
        return "-".to_string();
    }
    let total = total_stock(&product.stock);
    format!("{}/{}", total.online, total.in_store)
}

fn truncate(title: &str, width: usize) -> String {
    if title.chars().count() > width {
        let head: String = title.chars().take(width - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}
