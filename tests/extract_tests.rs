use scraper::Html;
use shelf_scan::browser::fetch_config::FetchConfig;
use shelf_scan::browser::fixture::FixtureFetcher;
use shelf_scan::detect::card_model::{DetectConfig, ProductCard};
use shelf_scan::detect::classifier::detect_cards;
use shelf_scan::extract::fallback::{complete_with_fallback, detail_price, fill_from_detail_page};
use shelf_scan::extract::fields::{
    asin_from_url, canonical_product_url, extract_fields, is_valid_asin, normalize_image_url,
    normalize_product_link,
};
use shelf_scan::extract::resolver::FieldResolver;
use url::Url;

mod common;

use crate::common::pages::{
    SEARCH_URL, card_html, detail_page, detail_url, quiet_resolve, search_page,
};

fn search_url() -> Url {
    Url::parse(SEARCH_URL).unwrap()
}

fn resolve_page(html: &str) -> Vec<ProductCard> {
    let url = search_url();
    let document = Html::parse_document(html);
    let config = quiet_resolve();
    detect_cards(&document, &DetectConfig::default())
        .iter()
        .map(|c| extract_fields(c, &url, &config))
        .collect()
}

// ============================================================================
// ASIN & link normalization
// ============================================================================

#[test]
fn asin_from_gp_product_url() {
    let href = "https://x/gp/product/B08XYZ1234?ref=sr_1_3";
    assert_eq!(asin_from_url(href).as_deref(), Some("B08XYZ1234"));

    let page = Url::parse("https://x/s?k=test").unwrap();
    let (asin, link) = normalize_product_link(href, &page).unwrap();
    assert_eq!(asin, "B08XYZ1234");
    assert_eq!(link, "https://x/dp/B08XYZ1234");
}

#[test]
fn asin_from_encoded_sponsored_redirect() {
    let href = "/sspa/click?ie=UTF8&url=%2FSony-Headphones%2Fdp%2FB0863TXGM3%2Fref%3Dsr_1_1_sspa";
    assert_eq!(asin_from_url(href).as_deref(), Some("B0863TXGM3"));
}

#[test]
fn asin_from_query_parameter() {
    assert_eq!(
        asin_from_url("https://www.amazon.com/gp/aw/d?ASIN=B07ZPKBL9V&th=1").as_deref(),
        Some("B07ZPKBL9V")
    );
    assert_eq!(asin_from_url("https://www.amazon.com/s?k=dp"), None);
}

#[test]
fn relative_link_resolves_against_page() {
    let (asin, link) =
        normalize_product_link("/Wireless-Earbuds/dp/B0BQPNMXQV/ref=sr_1_2?th=1", &search_url()).unwrap();
    assert_eq!(asin, "B0BQPNMXQV");
    assert_eq!(link, "https://www.amazon.com/dp/B0BQPNMXQV");
    assert_eq!(canonical_product_url(&asin, &search_url()), link);
}

#[test]
fn asin_validation() {
    assert!(is_valid_asin("B08XYZ1234"));
    assert!(!is_valid_asin("b08xyz1234"), "lowercase is not an asin");
    assert!(!is_valid_asin("B08XYZ123"));
}

#[test]
fn image_url_normalization() {
    let base = "https://m.media-amazon.com";
    assert_eq!(
        normalize_image_url("//m.media-amazon.com/images/I/a.jpg", base).as_deref(),
        Some("https://m.media-amazon.com/images/I/a.jpg")
    );
    assert_eq!(
        normalize_image_url("/images/I/b.jpg", base).as_deref(),
        Some("https://m.media-amazon.com/images/I/b.jpg")
    );
    assert_eq!(normalize_image_url("data:image/gif;base64,R0lGOD", base), None);
}

// ============================================================================
// Field extraction
// ============================================================================

#[test]
fn complete_card_needs_no_fallback() {
    let html = search_page(&[
        card_html("B000000001", "Studio Monitor Headphones", Some("$1,299.99")),
        card_html("B000000002", "Sport Earbuds", Some("$19.99")),
    ]);
    let cards = resolve_page(&html);

    assert_eq!(cards.len(), 2);
    let first = &cards[0];
    assert_eq!(first.asin.as_deref(), Some("B000000001"));
    assert_eq!(first.title.as_deref(), Some("Studio Monitor Headphones"));
    assert_eq!(first.price.as_deref(), Some("$1,299.99"));
    assert_eq!(first.link.as_deref(), Some("https://www.amazon.com/dp/B000000001"));
    assert_eq!(
        first.image.as_deref(),
        Some("https://m.media-amazon.com/images/I/B000000001.jpg")
    );
    assert!(!first.needs_fallback);
}

#[test]
fn missing_price_flags_fallback() {
    let html = search_page(&[
        card_html("B000000001", "Studio Monitor Headphones", None),
        card_html("B000000002", "Sport Earbuds", Some("$19.99")),
        card_html("B000000003", "Kids Headphones", Some("$9.99")),
    ]);
    let cards = resolve_page(&html);

    // The price-less card still has title and image, so it is detected.
    assert_eq!(cards.len(), 3);
    assert_eq!(cards[0].price, None);
    assert!(cards[0].needs_fallback);
    assert_eq!(cards[0].missing_fields(), vec!["price"]);
}

#[test]
fn title_skips_price_only_heading() {
    let html = r#"<html><body><div class="s-result-list">
        <div class="item"><h4>$5.00</h4><span class="product-name">Foam Ear Tips</span><img src="//img/1.jpg"></div>
        <div class="item"><h4>$6.00</h4><span class="product-name">Silicone Ear Tips</span><img src="//img/2.jpg"></div>
    </div></body></html>"#;
    let cards = resolve_page(html);

    assert_eq!(cards.len(), 2);
    assert_eq!(cards[0].title.as_deref(), Some("Foam Ear Tips"));
    assert_eq!(cards[0].price.as_deref(), Some("$5.00"));
    assert_eq!(cards[0].asin, None);
}

#[test]
fn data_asin_used_when_link_has_none() {
    let html = r#"<html><body><div class="s-result-list">
        <div class="s-result-item" data-asin="B0AAAAAAA1"><h2><a href="/promo">Cable A</a></h2><span>$3.00</span></div>
        <div class="s-result-item" data-asin="B0AAAAAAA2"><h2><a href="/promo">Cable B</a></h2><span>$4.00</span></div>
    </div></body></html>"#;
    let cards = resolve_page(html);

    assert_eq!(cards[0].asin.as_deref(), Some("B0AAAAAAA1"));
    assert_eq!(cards[0].link, None, "no product link on the card");
    assert!(cards[0].needs_fallback);
}

// ============================================================================
// Detail page fallback
// ============================================================================

#[test]
fn fallback_fills_only_missing_fields() {
    let mut card = ProductCard {
        asin: Some("B000000001".into()),
        title: Some("Listing Title".into()),
        price: None,
        link: Some(detail_url("B000000001")),
        image: None,
        needs_fallback: true,
    };
    let detail = Html::parse_document(&detail_page("B000000001", "Detail Page Title", "$42.00", &[]));

    fill_from_detail_page(&mut card, &detail, &search_url(), &quiet_resolve());
    card.refresh_needs_fallback();

    assert_eq!(card.title.as_deref(), Some("Listing Title"), "existing field kept");
    assert_eq!(card.price.as_deref(), Some("$42.00"));
    assert_eq!(
        card.image.as_deref(),
        Some("https://m.media-amazon.com/images/I/B000000001-large.jpg")
    );
    assert!(!card.needs_fallback);
}

#[test]
fn detail_page_supplies_asin_and_canonical_link() {
    let mut card = ProductCard::empty();
    let detail = Html::parse_document(&detail_page("B000000007", "Detail Page Title", "$42.00", &[]));

    fill_from_detail_page(&mut card, &detail, &search_url(), &quiet_resolve());

    assert_eq!(card.asin.as_deref(), Some("B000000007"));
    assert_eq!(card.link.as_deref(), Some(detail_url("B000000007").as_str()));
}

#[test]
fn detail_price_prefers_core_price_block() {
    let html = Html::parse_document(
        r#"<html><body>
        <div class="a-price"><span class="a-offscreen">$1.00</span></div>
        <div id="corePrice_feature_div"><span class="a-offscreen">$99.00</span></div>
        </body></html>"#,
    );
    assert_eq!(detail_price(&html).as_deref(), Some("$99.00"));
}

#[test]
fn fallback_fetches_detail_page() {
    let url = detail_url("B000000001");
    let mut fetcher =
        FixtureFetcher::new().with_page(&url, detail_page("B000000001", "Over-Ear Headphones", "$59.00", &[]));

    let card = ProductCard {
        asin: Some("B000000001".into()),
        title: None,
        price: None,
        link: None,
        image: None,
        needs_fallback: true,
    };
    let completed =
        complete_with_fallback(card, &mut fetcher, &FetchConfig::default(), &quiet_resolve(), &search_url());

    assert_eq!(fetcher.navigations(), &[url.clone()]);
    assert_eq!(completed.title.as_deref(), Some("Over-Ear Headphones"));
    assert_eq!(completed.price.as_deref(), Some("$59.00"));
    assert_eq!(completed.link.as_deref(), Some(url.as_str()));
    assert!(!completed.needs_fallback);
}

#[test]
fn fallback_failure_is_not_fatal() {
    let url = detail_url("B000000001");
    let mut fetcher = FixtureFetcher::new().with_failure(&url);

    let mut card = ProductCard::empty();
    card.asin = Some("B000000001".into());
    card.title = Some("Listing Title".into());

    let completed =
        complete_with_fallback(card, &mut fetcher, &FetchConfig::default(), &quiet_resolve(), &search_url());

    assert_eq!(completed.title.as_deref(), Some("Listing Title"));
    assert_eq!(completed.price, None);
    assert!(completed.needs_fallback);
}

#[test]
fn fallback_skipped_when_disabled() {
    let mut fetcher = FixtureFetcher::new();
    let mut config = quiet_resolve();
    config.fallback_enabled = false;

    let mut card = ProductCard::empty();
    card.asin = Some("B000000001".into());

    let completed = complete_with_fallback(card, &mut fetcher, &FetchConfig::default(), &config, &search_url());
    assert!(fetcher.navigations().is_empty());
    assert!(completed.needs_fallback);
}

#[test]
fn resolver_completes_incomplete_cards_in_order() {
    let html = search_page(&[
        card_html("B000000001", "Studio Monitor Headphones", None),
        card_html("B000000002", "Sport Earbuds", Some("$19.99")),
    ]);
    let url = search_url();
    let resolve = quiet_resolve();
    let fetch = FetchConfig::default();
    let resolver = FieldResolver::new(&url, &resolve, &fetch);

    let cards = {
        let document = Html::parse_document(&html);
        let candidates = detect_cards(&document, &DetectConfig::default());
        resolver.resolve_all(&candidates)
    };

    let mut fetcher = FixtureFetcher::new().with_page(
        &detail_url("B000000001"),
        detail_page("B000000001", "Studio Monitor Headphones", "$149.00", &[]),
    );
    let cards = resolver.complete(cards, &mut fetcher);

    assert_eq!(fetcher.navigations().len(), 1, "only the incomplete card is fetched");
    assert_eq!(cards[0].price.as_deref(), Some("$149.00"));
    assert_eq!(cards[1].price.as_deref(), Some("$19.99"));
}
