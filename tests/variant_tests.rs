use scraper::Html;
use shelf_scan::browser::fetch_config::FetchConfig;
use shelf_scan::browser::fixture::FixtureFetcher;
use shelf_scan::dom::anchor::DomAnchor;
use shelf_scan::variant::combinator::{
    EnumerationState, VariantDriver, cartesian_product, extract_variants,
};
use shelf_scan::variant::discovery::discover_dimensions;
use shelf_scan::variant::variant_model::{VariantConfig, VariantDimension, VariantOption};

mod common;

use crate::common::pages::{detail_page, detail_url, dimension_html, quiet_variants};

const ASIN: &str = "B0VARIANT1";

fn dimension(label: &str, count: usize) -> VariantDimension {
    VariantDimension {
        label: label.to_string(),
        options: (0..count)
            .map(|i| VariantOption {
                value: format!("{label}-{i}"),
                token: format!("t{i}"),
                anchor: DomAnchor::from_selector(format!("#{}_{i}", label.to_lowercase())),
            })
            .collect(),
    }
}

fn headphone_page() -> String {
    detail_page(
        ASIN,
        "Wireless Over-Ear Headphones",
        "$20.00",
        &[("Color", &["Black", "White"]), ("Size", &["S", "M", "L"])],
    )
}

// ============================================================================
// Cartesian product
// ============================================================================

#[test]
fn product_size_is_product_of_option_counts() {
    let dims = vec![dimension("Color", 2), dimension("Size", 3), dimension("Style", 2)];
    let combos = cartesian_product(&dims);

    assert_eq!(combos.len(), 12);
    assert_eq!(combos[0], vec![0, 0, 0]);
    assert_eq!(combos[1], vec![0, 0, 1], "last dimension varies fastest");
    assert_eq!(combos[11], vec![1, 2, 1]);
}

#[test]
fn no_dimensions_no_combinations() {
    assert!(cartesian_product(&[]).is_empty());
    assert!(cartesian_product(&[dimension("Color", 0)]).is_empty());
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn discovers_dimensions_in_document_order() {
    let html = Html::parse_document(&headphone_page());
    let dims = discover_dimensions(&html, &VariantConfig::default().dimension_labels);

    assert_eq!(dims.len(), 2);
    assert_eq!(dims[0].label, "Color");
    assert_eq!(dims[1].label, "Size");

    let colors: Vec<_> = dims[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(colors, vec!["Black", "White"], "'Click to select' prefix stripped");
    assert_eq!(dims[0].options[0].anchor.selector(), "#color_0");
    assert_eq!(dims[1].options.len(), 3);
}

#[test]
fn label_match_is_case_insensitive() {
    let page = format!(
        "<html><body>{}</body></html>",
        dimension_html("Colour", &["Red", "Blue"]).replace("Colour:", "COLOUR:")
    );
    let dims = discover_dimensions(&Html::parse_document(&page), &VariantConfig::default().dimension_labels);

    assert_eq!(dims.len(), 1);
    assert_eq!(dims[0].label, "Colour", "label reported in vocabulary spelling");
}

#[test]
fn swatch_alt_used_when_no_title() {
    let page = r#"<html><body><div id="twister">
        <div><span>Color:</span></div>
        <ul>
          <li data-defaultasin="B0SWATCH01"><img alt="Midnight Blue" src="//img/1.jpg"></li>
          <li data-defaultasin="B0SWATCH02"><img alt="Sand" src="//img/2.jpg"></li>
          <li data-defaultasin="B0SWATCH03" style="display:none"><img alt="Hidden" src="//img/3.jpg"></li>
        </ul>
    </div></body></html>"#;
    let dims = discover_dimensions(&Html::parse_document(page), &VariantConfig::default().dimension_labels);

    assert_eq!(dims.len(), 1);
    let values: Vec<_> = dims[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(values, vec!["Midnight Blue", "Sand"]);
    assert_eq!(dims[0].options[0].token, "B0SWATCH01");
}

#[test]
fn flat_sibling_sections_split_at_next_label() {
    let page = r#"<html><body><div id="twister">
        <span>Color:</span>
        <ul>
          <li data-asin="B0FLATCL01" title="Click to select Black">Black</li>
          <li data-asin="B0FLATCL02" title="Click to select Red">Red</li>
        </ul>
        <span>Size:</span>
        <ul>
          <li data-asin="B0FLATSZ01">Small</li>
          <li data-asin="B0FLATSZ02">Medium</li>
          <li data-asin="B0FLATSZ03">Large</li>
        </ul>
    </div></body></html>"#;
    let dims = discover_dimensions(&Html::parse_document(page), &VariantConfig::default().dimension_labels);

    assert_eq!(dims.len(), 2);
    assert_eq!(dims[0].label, "Color");
    let colors: Vec<_> = dims[0].options.iter().map(|o| o.value.as_str()).collect();
    assert_eq!(colors, vec!["Black", "Red"]);

    assert_eq!(dims[1].label, "Size");
    let sizes: Vec<_> = dims[1].options.iter().map(|o| o.token.as_str()).collect();
    assert_eq!(sizes, vec!["B0FLATSZ01", "B0FLATSZ02", "B0FLATSZ03"]);
}

#[test]
fn options_listed_directly_after_label() {
    let page = r#"<html><body><div id="twister">
        <b>Style:</b>
        <button data-value="classic">Classic</button>
        <button data-value="sport">Sport</button>
        <b>Pattern:</b>
        <button data-value="plain">Plain</button>
    </div></body></html>"#;
    let dims = discover_dimensions(&Html::parse_document(page), &VariantConfig::default().dimension_labels);

    assert_eq!(dims.len(), 2);
    assert_eq!(dims[0].options.len(), 2);
    assert_eq!(dims[1].label, "Pattern");
    assert_eq!(dims[1].options[0].value, "Plain");
}

#[test]
fn page_without_variants_has_no_dimensions() {
    let html = Html::parse_document(&detail_page(ASIN, "Plain Cable", "$5.00", &[]));
    assert!(discover_dimensions(&html, &VariantConfig::default().dimension_labels).is_empty());
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn enumerates_every_combination_with_prices() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new()
        .with_page(&url, headphone_page())
        .with_click_effect("#size_2", "#corePrice_feature_div", "$25.00");

    let variants = extract_variants(&mut fetcher, &url, &FetchConfig::default(), &quiet_variants());

    assert_eq!(variants.len(), 6);
    assert_eq!(variants[0].assignment.get("Color"), Some("Black"));
    assert_eq!(variants[0].assignment.get("Size"), Some("S"));
    assert_eq!(variants[0].price.as_deref(), Some("$20.00"));
    assert_eq!(variants[2].assignment.get("Size"), Some("L"));
    assert_eq!(variants[2].price.as_deref(), Some("$25.00"));
    assert_eq!(variants[5].assignment.get("Color"), Some("White"));
}

#[test]
fn unchanged_selection_is_not_reclicked() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new().with_page(&url, headphone_page());

    extract_variants(&mut fetcher, &url, &FetchConfig::default(), &quiet_variants());

    // Color is clicked once per value, size once per combination.
    let color_clicks = fetcher.clicks().iter().filter(|c| c.starts_with("#color")).count();
    let size_clicks = fetcher.clicks().iter().filter(|c| c.starts_with("#size")).count();
    assert_eq!(color_clicks, 2);
    assert_eq!(size_clicks, 6);
}

#[test]
fn await_timeout_yields_null_price() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new()
        .with_page(&url, headphone_page())
        .with_stalled_click("#size_1");

    let variants = extract_variants(&mut fetcher, &url, &FetchConfig::default(), &quiet_variants());

    assert_eq!(variants.len(), 6, "a timeout never drops a combination");
    assert_eq!(variants[1].assignment.get("Size"), Some("M"));
    assert_eq!(variants[1].price, None);
    assert_eq!(variants[4].price, None);
    assert!(variants[0].price.is_some());
    assert!(variants[2].price.is_some());
}

#[test]
fn interaction_error_keeps_enumerating() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new()
        .with_page(&url, headphone_page())
        .with_broken_click("#color_1");

    let variants = extract_variants(&mut fetcher, &url, &FetchConfig::default(), &quiet_variants());

    assert_eq!(variants.len(), 6);
    assert!(variants[..3].iter().all(|v| v.price.is_some()));
    assert!(variants[3..].iter().all(|v| v.price.is_none()));
    assert_eq!(variants[3].assignment.get("Color"), Some("White"));
}

#[test]
fn navigation_retried_then_abandoned() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new().with_failure(&url);
    let config = VariantConfig {
        attempts: 2,
        ..quiet_variants()
    };

    let variants = extract_variants(&mut fetcher, &url, &FetchConfig::default(), &config);

    assert!(variants.is_empty());
    assert_eq!(fetcher.navigations().len(), 2);
}

#[test]
fn driver_walks_state_machine() {
    let url = detail_url(ASIN);
    let page = detail_page(ASIN, "Earbuds", "$20.00", &[("Color", &["Black", "White"])]);
    let mut fetcher = FixtureFetcher::new().with_page(&url, page.clone());
    let _ = shelf_scan::browser::fetcher::PageFetcher::navigate(&mut fetcher, &url, &FetchConfig::default());

    let dims = discover_dimensions(&Html::parse_document(&page), &VariantConfig::default().dimension_labels);
    let config = quiet_variants();
    let mut driver = VariantDriver::new(&mut fetcher, &dims, &config);

    assert_eq!(driver.state(), EnumerationState::Idle);
    assert_eq!(driver.step(), EnumerationState::SelectDimension(0));
    assert_eq!(driver.step(), EnumerationState::AwaitUpdate(0));
    assert_eq!(driver.step(), EnumerationState::CapturePrice(0));
    assert_eq!(driver.step(), EnumerationState::NextCombination);
    assert_eq!(driver.step(), EnumerationState::SelectDimension(0));

    let mut steps = 0;
    while driver.step() != EnumerationState::Done {
        steps += 1;
        assert!(steps < 10, "enumeration must terminate");
    }
    assert_eq!(driver.run().len(), 2);
}

#[test]
fn assignment_serializes_in_dimension_order() {
    let url = detail_url(ASIN);
    let mut fetcher = FixtureFetcher::new().with_page(&url, headphone_page());
    let variants = extract_variants(&mut fetcher, &url, &FetchConfig::default(), &quiet_variants());

    let json = serde_json::to_string(&variants[0]).unwrap();
    assert_eq!(
        json,
        r#"{"assignment":{"Color":"Black","Size":"S"},"price":"$20.00"}"#
    );
}
