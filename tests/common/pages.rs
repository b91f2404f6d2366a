use shelf_scan::browser::fetch_config::FetchConfig;
use shelf_scan::detect::card_model::ProductCard;
use shelf_scan::extract::fields::{DelayRange, ResolveConfig};
use shelf_scan::stability::aggregator::HarvestSettings;
use shelf_scan::stability::stability_model::RunSnapshot;
use shelf_scan::variant::variant_model::VariantConfig;

pub const SEARCH_URL: &str = "https://www.amazon.com/s?k=wireless+headphones";

pub fn detail_url(asin: &str) -> String {
    format!("https://www.amazon.com/dp/{asin}")
}

// ============================================================================
// Search result pages
// ============================================================================

/// A search result card in the usual layout: heading link, image, price row.
pub fn card_html(asin: &str, title: &str, price: Option<&str>) -> String {
    let price_row = match price {
        Some(p) => format!(r#"<span class="a-price"><span class="a-offscreen">{p}</span></span>"#),
        None => "<span>See options</span>".to_string(),
    };
    format!(
        r#"<div class="s-result-item s-asin" data-asin="{asin}">
  <h2 class="a-size-medium"><a class="a-link-normal" href="/{slug}/dp/{asin}/ref=sr_1_1?keywords=headphones">{title}</a></h2>
  <img class="s-image" src="//m.media-amazon.com/images/I/{asin}.jpg" alt="{title}">
  <div class="a-row">{price_row}</div>
</div>"#,
        slug = title.replace(' ', "-"),
    )
}

pub fn search_page(cards: &[String]) -> String {
    format!(
        r#"<html><head><title>Amazon.com : wireless headphones</title></head><body>
<div class="s-main-slot s-result-list">
{}
</div>
</body></html>"#,
        cards.join("\n")
    )
}

/// A search page listing complete cards for `asins`.
pub fn search_page_for(asins: &[&str]) -> String {
    let cards: Vec<String> = asins
        .iter()
        .enumerate()
        .map(|(i, asin)| card_html(asin, &format!("Headphones Model {}", i + 1), Some("$29.99")))
        .collect();
    search_page(&cards)
}

// ============================================================================
// Product detail pages
// ============================================================================

pub fn dimension_html(label: &str, values: &[&str]) -> String {
    let slug = label.to_lowercase();
    let options: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            format!(
                r#"<li id="{slug}_{i}" title="Click to select {v}" data-defaultasin="{slug}-{i}"><span class="a-list-item">{v}</span></li>"#
            )
        })
        .collect();
    format!(
        r#"<div id="variation_{slug}">
  <div class="a-row"><label class="a-form-label">{label}:</label></div>
  <ul class="a-unordered-list">{}</ul>
</div>"#,
        options.join("")
    )
}

pub fn detail_page(asin: &str, title: &str, price: &str, dimensions: &[(&str, &[&str])]) -> String {
    let sections: Vec<String> = dimensions
        .iter()
        .map(|(label, values)| dimension_html(label, values))
        .collect();
    format!(
        r#"<html><head><link rel="canonical" href="https://www.amazon.com/Headphones/dp/{asin}"></head><body>
<input type="hidden" id="ASIN" name="ASIN" value="{asin}">
<span id="productTitle">  {title}  </span>
<div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">{price}</span></span></div>
<img id="landingImage" src="https://m.media-amazon.com/images/I/{asin}-large.jpg">
{}
</body></html>"#,
        sections.join("\n")
    )
}

// ============================================================================
// Models
// ============================================================================

pub fn product(asin: &str) -> ProductCard {
    ProductCard {
        asin: Some(asin.to_string()),
        title: Some(format!("Product {asin}")),
        price: Some("$10.00".to_string()),
        link: Some(detail_url(asin)),
        image: Some(format!("https://m.media-amazon.com/images/I/{asin}.jpg")),
        needs_fallback: false,
    }
}

pub fn snapshot(pass_index: usize, asins: &[&str]) -> RunSnapshot {
    RunSnapshot::from_cards(pass_index, asins.iter().map(|a| product(a)))
}

/// Settings with every pause removed and nothing written to disk.
pub fn quiet_settings() -> HarvestSettings {
    let mut settings = HarvestSettings::default();
    settings.fetch = FetchConfig {
        scroll_steps: 0,
        scroll_delay_ms: 0,
        ..FetchConfig::default()
    };
    settings.resolve = quiet_resolve();
    settings.variants = quiet_variants();
    settings
}

pub fn quiet_resolve() -> ResolveConfig {
    ResolveConfig {
        fallback_delay: DelayRange::none(),
        ..ResolveConfig::default()
    }
}

pub fn quiet_variants() -> VariantConfig {
    VariantConfig {
        option_delay: DelayRange::none(),
        await_timeout_ms: 50,
        ..VariantConfig::default()
    }
}
