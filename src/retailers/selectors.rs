//! CSS selectors for retailer page parsing.
//!
//! All selectors live here so that a storefront redesign only needs changes
//! in one place.
//!
//! **Update process**: When extraction fails, capture an HTML sample,
//! update the selectors, and add a fixture under `tests/fixtures`.

use scraper::Selector;
use std::sync::LazyLock;

/// Amazon AU search results.
pub mod amazon {
    use super::*;

    /// Product card container.
    pub static RESULT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[data-component-type='s-search-result']").unwrap());

    /// Result list wrapper, present even when a search has no hits.
    pub static RESULTS_CONTAINER: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(".s-search-results, .s-no-search-results, .s-main-slot").unwrap()
    });

    /// ASIN attribute on result card.
    pub static ASIN_ATTR: &str = "data-asin";

    pub static TITLE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "h2 a span, \
             h2 span.a-text-normal, \
             .a-size-medium.a-text-normal, \
             .a-size-base-plus.a-text-normal",
        )
        .unwrap()
    });

    pub static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "h2 a.a-link-normal, \
             h2 a.s-link-style, \
             .a-link-normal.s-underline-text, \
             h2 a",
        )
        .unwrap()
    });

    pub static IMAGE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("img.s-image, .s-product-image-container img").unwrap());

    /// Full current price, e.g. "$45.99".
    pub static PRICE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            ".a-price:not([data-a-strike]) .a-offscreen, \
             .a-price .a-offscreen",
        )
        .unwrap()
    });

    /// Star rating text like "4.5 out of 5 stars".
    pub static RATING_STARS: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "i.a-icon-star-small span.a-icon-alt, \
             i.a-icon-star span.a-icon-alt, \
             span.a-icon-alt",
        )
        .unwrap()
    });

    pub static RATING_COUNT: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "span.a-size-base.s-underline-text, \
             a[href*='customerReviews'] span, \
             .a-size-base.puis-light-weight-text",
        )
        .unwrap()
    });

    pub static PRIME_BADGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "i.a-icon-prime, \
             span.a-icon-prime, \
             [data-component-type='s-prime-badge']",
        )
        .unwrap()
    });

    /// Text blocks that carry "Currently unavailable" and similar notices.
    pub static AVAILABILITY_TEXT: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse(".a-color-price, .a-color-secondary").unwrap());

    pub static BRAND: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "h5.s-line-clamp-1 span, \
             .a-row.a-size-base.a-color-secondary span.a-size-base-plus",
        )
        .unwrap()
    });

    pub static NEXT_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            "a.s-pagination-next, \
             .s-pagination-item.s-pagination-next:not(.s-pagination-disabled)",
        )
        .unwrap()
    });

    /// CAPTCHA form shown to suspected bots.
    pub static CAPTCHA: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("form[action*='validateCaptcha'], img[src*='captcha']").unwrap()
    });

    /// Amazon's "dog page" served on 503.
    pub static DOG_PAGE: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse("img[alt*='Dogs of Amazon'], a[href='/ref=cs_503_link']").unwrap()
    });
}

/// Big W category pages. Products live in embedded Next.js data.
pub mod bigw {
    use super::*;

    pub static NEXT_DATA: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("script#__NEXT_DATA__").unwrap());
}

/// EB Games search pages.
pub mod ebgames {
    use super::*;

    /// Card containers in preference order. The first one that matches wins.
    pub static CARDS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [".product-tile", ".product-card", "[data-product-id]", "article", ".product-item"]
            .iter()
            .map(|s| Selector::parse(s).unwrap())
            .collect()
    });

    /// Title candidates in preference order.
    pub static TITLES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [
            ".name",
            ".product-name",
            ".product-title",
            "[class*='product-name']",
            "a[class*='name']",
            "h3",
            "h2",
            "h4",
        ]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
    });

    pub static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

    pub static PRICES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        [".price", "[class*='price']", "[data-price]"]
            .iter()
            .map(|s| Selector::parse(s).unwrap())
            .collect()
    });

    /// Elements whose text reveals preorder, sold-out or add-to-cart state.
    pub static STOCK: LazyLock<Vec<Selector>> = LazyLock::new(|| {
        ["button[class*='preorder']", "[class*='availability']", "[class*='stock']", "button"]
            .iter()
            .map(|s| Selector::parse(s).unwrap())
            .collect()
    });

    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

    /// Listing wrapper, present even when a search has no hits.
    pub static LISTING: LazyLock<Selector> = LazyLock::new(|| {
        Selector::parse(
            ".search-results, .product-grid, .product-list, [class*='search-result'], .no-results",
        )
        .unwrap()
    });
}

/// Kmart category pages. Products come from JSON-LD blocks.
pub mod kmart {
    use super::*;

    pub static JSON_LD: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("script[type='application/ld+json']").unwrap());
}

/// Target AU search pages.
pub mod target {
    use super::*;

    pub static PRODUCT_LINK: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href*='/p/']").unwrap());

    pub static IMAGE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").unwrap());

    pub static PRICE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("[class*='price'], [class*='Price']").unwrap());

    /// Page body wrapper, present even when a search has no hits.
    pub static LISTING: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("main, [data-testid*='search'], .search-results").unwrap());
}
