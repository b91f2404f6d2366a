use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::detect::card_model::{CardCandidate, ProductCard};
use crate::detect::patterns::{find_price, is_heading, is_price_text, is_title_like};
use crate::dom::tree::{attr, element_text, query, tag_name, text_nodes};

// ============================================================================
// ASIN patterns
// ============================================================================

static ASIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{10}$").expect("valid asin regex"));

/// Where an ASIN can sit inside a product URL, most specific first.
static ASIN_IN_URL: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/dp/([A-Z0-9]{10})(?:[/?#&]|$)",
        r"/gp/product/([A-Z0-9]{10})(?:[/?#&]|$)",
        r"/product/([A-Z0-9]{10})(?:[/?#&]|$)",
        r"[?&]ASIN=([A-Z0-9]{10})(?:[&#]|$)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid asin url regex"))
    .collect()
});

pub fn is_valid_asin(candidate: &str) -> bool {
    ASIN.is_match(candidate)
}

/// Pull the ASIN out of a (possibly percent-encoded) product URL.
///
/// Sponsored links wrap the product path in an encoded redirect parameter,
/// so the href is decoded before matching.
pub fn asin_from_url(href: &str) -> Option<String> {
    let decoded = urlencoding::decode(href)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| href.to_string());

    ASIN_IN_URL
        .iter()
        .find_map(|re| re.captures(&decoded))
        .map(|caps| caps[1].to_string())
}

// ============================================================================
// URL normalization
// ============================================================================

/// `{scheme}://{host}/dp/{asin}` on the origin of `page_url`.
pub fn canonical_product_url(asin: &str, origin_of: &Url) -> String {
    format!("{}/dp/{}", origin(origin_of), asin)
}

fn origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolve `href` against the page it was found on and normalize it to the
/// canonical product URL. Returns `(asin, link)`.
pub fn normalize_product_link(href: &str, page_url: &Url) -> Option<(String, String)> {
    let absolute = page_url.join(href).ok()?;
    let asin = asin_from_url(absolute.as_str())?;
    let link = canonical_product_url(&asin, &absolute);
    Some((asin, link))
}

/// Absolute image URL; protocol-relative sources get `https:`, root-relative
/// ones are resolved against the image host. Inline `data:` placeholders and
/// unrecognised forms are rejected.
pub fn normalize_image_url(src: &str, image_base: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() || src.starts_with("data:") {
        return None;
    }
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src.to_string());
    }
    if let Some(rest) = src.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if src.starts_with('/') {
        return Url::parse(image_base)
            .and_then(|base| base.join(src))
            .ok()
            .map(|u| u.to_string());
    }
    None
}

// ============================================================================
// Resolution configuration
// ============================================================================

/// Inclusive range for the randomized pause before a fallback fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub fn none() -> Self {
        Self { min_ms: 0, max_ms: 0 }
    }

    pub fn sample_ms(&self) -> u64 {
        if self.max_ms <= self.min_ms {
            return self.min_ms;
        }
        fastrand::u64(self.min_ms..=self.max_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Host used for root-relative image sources.
    pub image_base: String,
    pub fallback_enabled: bool,
    pub fallback_delay: DelayRange,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            image_base: "https://m.media-amazon.com".to_string(),
            fallback_enabled: true,
            fallback_delay: DelayRange {
                min_ms: 3_000,
                max_ms: 8_000,
            },
        }
    }
}

// ============================================================================
// Field extraction from a classified card
// ============================================================================

/// Extract the five canonical fields from a card and flag incompleteness.
/// Pure: no fetching happens here.
pub fn extract_fields(candidate: &CardCandidate<'_>, page_url: &Url, config: &ResolveConfig) -> ProductCard {
    extract_fields_from(&candidate.element, page_url, config)
}

pub fn extract_fields_from(card: &ElementRef<'_>, page_url: &Url, config: &ResolveConfig) -> ProductCard {
    let (asin_from_link, link) = find_link(card, page_url).unzip();
    let asin = asin_from_link.or_else(|| find_data_asin(card));

    let mut product = ProductCard {
        asin,
        title: find_title(card),
        price: find_card_price(card),
        link,
        image: find_image(card, &config.image_base),
        needs_fallback: false,
    };
    product.refresh_needs_fallback();
    product
}

fn find_link(card: &ElementRef<'_>, page_url: &Url) -> Option<(String, String)> {
    query(*card, |el| tag_name(el) == "a")
        .iter()
        .filter_map(|a| attr(a, "href"))
        .find_map(|href| normalize_product_link(href, page_url))
}

fn find_data_asin(card: &ElementRef<'_>) -> Option<String> {
    std::iter::once(*card)
        .chain(query(*card, |el| el.value().attr("data-asin").is_some()))
        .filter_map(|el| attr(&el, "data-asin"))
        .find(|value| is_valid_asin(value))
        .map(str::to_string)
}

fn usable_title(el: &ElementRef<'_>) -> Option<String> {
    let text = element_text(el);
    (!text.is_empty() && !is_price_text(&text)).then_some(text)
}

/// First heading, else first title/name-classed element, else first span,
/// whose text is non-empty and is not just a price.
fn find_title(card: &ElementRef<'_>) -> Option<String> {
    query(*card, is_heading)
        .iter()
        .find_map(usable_title)
        .or_else(|| query(*card, is_title_like).iter().find_map(usable_title))
        .or_else(|| {
            query(*card, |el| tag_name(el) == "span")
                .iter()
                .find_map(usable_title)
        })
}

fn find_card_price(card: &ElementRef<'_>) -> Option<String> {
    text_nodes(card).into_iter().find_map(find_price)
}

fn find_image(card: &ElementRef<'_>, image_base: &str) -> Option<String> {
    query(*card, |el| tag_name(el) == "img").iter().find_map(|img| {
        ["src", "data-src"]
            .iter()
            .filter_map(|name| attr(img, name))
            .find_map(|src| normalize_image_url(src, image_base))
    })
}
