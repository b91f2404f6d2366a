use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

use crate::dom::tree::{class_contains, element_text, tag_name};

/// Currency symbol, integer part (optionally with thousands groups), optional
/// decimal group: `$10`, `$3.50`, `$1,000`, `£1,299.99`.
pub static PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[$€£¥₹]\s?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d{1,2})?").expect("valid price regex")
});

pub const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4"];

const TITLE_CLASS_HINTS: &[&str] = &["title", "name"];

/// First currency amount in `text`, if any.
pub fn find_price(text: &str) -> Option<String> {
    PRICE.find(text).map(|m| m.as_str().replace(char::is_whitespace, ""))
}

pub fn is_price_text(text: &str) -> bool {
    PRICE.is_match(text)
}

pub fn is_heading(el: &ElementRef<'_>) -> bool {
    HEADING_TAGS.contains(&tag_name(el))
}

/// A heading, or an element whose class names it as a title/name, that has
/// some text.
pub fn is_title_like(el: &ElementRef<'_>) -> bool {
    (is_heading(el) || class_contains(el, TITLE_CLASS_HINTS)) && !element_text(el).is_empty()
}
