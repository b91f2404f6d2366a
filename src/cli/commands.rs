use std::path::Path;

use tracing::info;
use url::Url;

use crate::browser::fetcher::PageFetcher;
use crate::browser::fixture::FixtureFetcher;
use crate::browser::http::HttpFetcher;
use crate::browser::session::BrowserSession;
use crate::cli::config::{AppConfig, FetcherKind, RunOverrides, build_harvest_settings};
use crate::detect::classifier::detect_cards;
use crate::dom::tree::parse;
use crate::error::HarvestError;
use crate::extract::resolver::FieldResolver;
use crate::report::console::{format_cards, format_harvest_report, format_stats_report};
use crate::report::json_output::{load_run_files, write_final, write_outcome, write_stats};
use crate::stability::aggregator::{StabilityAggregator, compute_stats, stable_records};
use crate::stability::stability_model::HarvestOutcome;
use crate::trace::logger::TraceLogger;

// ============================================================================
// run subcommand
// ============================================================================

/// Harvest `url` and write `final.json` / `stats.json`.
pub fn cmd_run(
    url: &str,
    fetcher: Option<FetcherKind>,
    overrides: &RunOverrides,
    config: &AppConfig,
    trace: &TraceLogger,
) -> Result<HarvestOutcome, Box<dyn std::error::Error>> {
    let mut settings = build_harvest_settings(config, overrides);
    settings.run.write_runs = true;
    let kind = fetcher.unwrap_or(config.browser.fetcher);

    let mut fetcher: Box<dyn PageFetcher> = match kind {
        FetcherKind::Browser => Box::new(BrowserSession::launch(&config.browser.script)?),
        FetcherKind::Http => {
            if settings.variants.enabled {
                info!("http fetcher cannot select options, variants disabled");
                settings.variants.enabled = false;
            }
            Box::new(HttpFetcher::new()?)
        }
    };

    let passes = settings.run.passes;
    let outcome = StabilityAggregator::new(fetcher.as_mut(), &settings, trace).run(url, passes)?;

    write_outcome(Path::new(&settings.run.output_dir), &outcome)?;
    print!("{}", format_harvest_report(&outcome));

    Ok(outcome)
}

// ============================================================================
// detect subcommand
// ============================================================================

/// Detect and resolve cards in a saved page. No network access: the
/// fallback is disabled and the fetcher only serves the saved page.
pub fn cmd_detect(
    html_path: &str,
    page_url: &str,
    format: &str,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let markup = std::fs::read_to_string(html_path).map_err(|e| HarvestError::Input {
        path: html_path.to_string(),
        source: e,
    })?;
    let url = Url::parse(page_url)
        .map_err(|e| HarvestError::Config(format!("invalid page url '{page_url}': {e}")))?;

    let mut fetcher = FixtureFetcher::single_page(markup);
    let html = fetcher.navigate(url.as_str(), &config.harvest.fetch)?;

    let mut resolve = config.harvest.resolve.clone();
    resolve.fallback_enabled = false;
    let resolver = FieldResolver::new(&url, &resolve, &config.harvest.fetch);

    let document = parse(&html);
    let candidates = detect_cards(&document, &config.harvest.detect);
    let cards = resolver.resolve_all(&candidates);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&cards)?),
        _ => print!("{}", format_cards(&cards)),
    }
    Ok(())
}

// ============================================================================
// aggregate subcommand
// ============================================================================

/// Recompute stats and the stable set from `run{n}.json` files on disk.
pub fn cmd_aggregate(dir: &str, output_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let snapshots = load_run_files(Path::new(dir))?;
    if snapshots.is_empty() {
        return Err(HarvestError::NoPageContent {
            url: dir.to_string(),
            passes: 0,
        }
        .into());
    }

    let stats = compute_stats(&snapshots);
    let records = stable_records(&snapshots);

    let out = Path::new(output_dir.unwrap_or(dir));
    write_final(out, &records)?;
    write_stats(out, &stats)?;

    print!("{}", format_stats_report(&stats, &records));
    Ok(())
}
