use std::sync::LazyLock;
use std::thread;
use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::PageFetcher;
use crate::detect::card_model::ProductCard;
use crate::detect::patterns::find_price;
use crate::dom::tree::{attr, element_text, text_nodes};
use crate::extract::fields::{
    asin_from_url, canonical_product_url, is_valid_asin, normalize_image_url, ResolveConfig,
};

// ============================================================================
// Detail page anchors
// ============================================================================

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().filter_map(|css| Selector::parse(css).ok()).collect()
}

static TITLE_ANCHORS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["#productTitle", "#title", "h1.a-size-large"]));

static IMAGE_ANCHORS: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["#landingImage", "#imgBlkFront", "#main-image"]));

/// Price containers on a detail page, most authoritative first. The last
/// entry is the loose catch-all for layouts without a known container.
pub const PRICE_ANCHORS: &[&str] = &[
    "#corePrice_feature_div",
    "#corePriceDisplay_desktop_feature_div",
    "#apex_desktop",
    "#priceblock_ourprice",
    "#price_inside_buybox",
    ".a-price .a-offscreen",
];

static PRICE_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| selectors(PRICE_ANCHORS));

static ASIN_INPUT: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["input#ASIN", "input[name='ASIN']"]));

static CANONICAL_LINK: LazyLock<Vec<Selector>> =
    LazyLock::new(|| selectors(&["link[rel='canonical']"]));

const MIN_TITLE_LEN: usize = 5;

// ============================================================================
// Fallback pass
// ============================================================================

/// Re-resolve the missing fields of `card` from its product detail page.
///
/// Never fails: a fetch error or a missing anchor leaves the field empty and
/// the card flagged. Only fields that are missing get written.
pub fn complete_with_fallback<F>(
    mut card: ProductCard,
    fetcher: &mut F,
    fetch: &FetchConfig,
    config: &ResolveConfig,
    page_url: &Url,
) -> ProductCard
where
    F: PageFetcher + ?Sized,
{
    if !card.needs_fallback || !config.fallback_enabled {
        return card;
    }

    let target = card
        .link
        .clone()
        .or_else(|| card.asin.as_deref().map(|asin| canonical_product_url(asin, page_url)));
    let Some(target) = target else {
        debug!("card has neither link nor asin, fallback skipped");
        return card;
    };

    let pause = config.fallback_delay.sample_ms();
    if pause > 0 {
        thread::sleep(Duration::from_millis(pause));
    }

    let missing = card.missing_fields();
    debug!(url = %target, ?missing, "running detail page fallback");

    let html = match fetcher.navigate(&target, &fetch.randomized()) {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %target, error = %e, "fallback fetch failed");
            return card;
        }
    };

    let document = Html::parse_document(&html);
    fill_from_detail_page(&mut card, &document, page_url, config);

    card.refresh_needs_fallback();
    card
}

/// Fill missing fields from the fixed anchors of a product detail page.
pub fn fill_from_detail_page(
    card: &mut ProductCard,
    document: &Html,
    page_url: &Url,
    config: &ResolveConfig,
) {
    if card.asin.is_none() {
        card.asin = detail_asin(document);
    }

    if card.title.is_none() {
        card.title = first_match(document, &TITLE_ANCHORS)
            .map(|el| element_text(&el))
            .filter(|title| title.chars().count() >= MIN_TITLE_LEN);
    }

    if card.price.is_none() {
        card.price = detail_price(document);
    }

    if card.image.is_none() {
        card.image = IMAGE_ANCHORS.iter().find_map(|sel| {
            document.select(sel).find_map(|img| {
                ["src", "data-old-hires", "data-src"]
                    .iter()
                    .filter_map(|name| attr(&img, name))
                    .find_map(|src| normalize_image_url(src, &config.image_base))
            })
        });
    }

    if card.link.is_none() {
        card.link = card.asin.as_deref().map(|asin| canonical_product_url(asin, page_url));
    }
}

/// Price from the first anchored container that holds a currency amount.
pub fn detail_price(document: &Html) -> Option<String> {
    PRICE_SELECTORS.iter().find_map(|sel| {
        document
            .select(sel)
            .find_map(|container| text_nodes(&container).into_iter().find_map(find_price))
    })
}

fn detail_asin(document: &Html) -> Option<String> {
    let from_input = ASIN_INPUT.iter().find_map(|sel| {
        document
            .select(sel)
            .filter_map(|input| attr(&input, "value"))
            .find(|value| is_valid_asin(value))
            .map(str::to_string)
    });

    from_input.or_else(|| {
        CANONICAL_LINK.iter().find_map(|sel| {
            document
                .select(sel)
                .filter_map(|link| attr(&link, "href"))
                .find_map(asin_from_url)
        })
    })
}

fn first_match<'a>(document: &'a Html, anchors: &[Selector]) -> Option<scraper::ElementRef<'a>> {
    anchors
        .iter()
        .find_map(|sel| document.select(sel).next())
}
