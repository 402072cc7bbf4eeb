//! Lists supported retailers.

use crate::retailers::Retailer;

/// Table of retailer codes, names, default poll intervals and pages.
pub fn list_retailers() -> String {
    let mut lines = Vec::new();

    lines.push("Supported retailers:\n".to_string());
    lines.push(format!("{:<9} {:<10} {:<6} {}", "Code", "Name", "Poll", "Default page"));
    lines.push(format!("{:-<9} {:-<10} {:-<6} {:-<40}", "", "", "", ""));

    for retailer in Retailer::all() {
        lines.push(format!(
            "{:<9} {:<10} {:<6} {}",
            retailer.to_string(),
            retailer.display_name(),
            format!("{}s", retailer.default_poll_secs()),
            retailer.default_url().unwrap_or("(set `url` to the store's products.json)")
        ));
    }

    lines.join("\n")
}
