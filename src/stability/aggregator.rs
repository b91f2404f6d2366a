use std::collections::HashMap;
use std::path::Path;

use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::PageFetcher;
use crate::detect::card_model::DetectConfig;
use crate::detect::classifier::detect_cards;
use crate::error::{FetchError, HarvestError};
use crate::extract::fields::ResolveConfig;
use crate::extract::resolver::FieldResolver;
use crate::report::json_output::write_run_file;
use crate::stability::stability_model::{
    FinalRecord, HarvestConfig, HarvestOutcome, RunSnapshot, StabilityStats,
};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::{HarvestEvent, HarvestStage};
use crate::variant::combinator::extract_variants;
use crate::variant::variant_model::VariantConfig;

/// Every knob of a harvest, one section per stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    pub fetch: FetchConfig,
    pub detect: DetectConfig,
    pub resolve: ResolveConfig,
    pub variants: VariantConfig,
    pub run: HarvestConfig,
}

// ============================================================================
// Pure aggregation over snapshots
// ============================================================================

/// Per-asin pass counts, with asins in first-seen order.
fn asin_counts(snapshots: &[RunSnapshot]) -> (Vec<&str>, HashMap<&str, usize>) {
    let mut order = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for snapshot in snapshots {
        for asin in snapshot.asins() {
            let count = counts.entry(asin).or_insert(0);
            if *count == 0 {
                order.push(asin);
            }
            *count += 1;
        }
    }
    (order, counts)
}

/// Stability statistics over the given passes. No passes yields all zeros.
pub fn compute_stats(snapshots: &[RunSnapshot]) -> StabilityStats {
    if snapshots.is_empty() {
        return StabilityStats::default();
    }

    let run_count = snapshots.len();
    let (order, counts) = asin_counts(snapshots);
    let sizes: Vec<usize> = snapshots.iter().map(RunSnapshot::len).collect();

    let singleton_asins: Vec<String> = order
        .iter()
        .filter(|asin| counts[*asin] == 1)
        .map(|asin| asin.to_string())
        .collect();

    // First-pass order; an asin in every pass is always in the first one.
    let stable_asins: Vec<String> = snapshots[0]
        .asins()
        .filter(|asin| counts.get(asin) == Some(&run_count))
        .map(str::to_string)
        .collect();

    StabilityStats {
        run_count,
        unique_asin_count: order.len(),
        avg_per_run: sizes.iter().sum::<usize>() as f64 / run_count as f64,
        max_per_run: sizes.iter().copied().max().unwrap_or(0),
        min_per_run: sizes.iter().copied().min().unwrap_or(0),
        singleton_count: singleton_asins.len(),
        stable_count: stable_asins.len(),
        singleton_asins,
        stable_asins,
    }
}

/// One record per stable asin, taken from the first pass, without variants.
pub fn stable_records(snapshots: &[RunSnapshot]) -> Vec<FinalRecord> {
    let Some(first) = snapshots.first() else {
        return Vec::new();
    };

    first
        .products()
        .iter()
        .filter(|card| {
            card.asin
                .as_deref()
                .is_some_and(|asin| snapshots.iter().all(|s| s.contains(asin)))
        })
        .map(|card| FinalRecord {
            product: card.clone(),
            variants: Vec::new(),
        })
        .collect()
}

/// Lowercased words of the `k` query parameter of a search URL.
pub fn search_keywords(search_url: &Url) -> Vec<String> {
    search_url
        .query_pairs()
        .find(|(key, _)| key == "k")
        .map(|(_, value)| {
            value
                .split_whitespace()
                .map(|w| w.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Multi-pass driver
// ============================================================================

/// Runs N sequential passes over one search page, then aggregates them.
///
/// Holds the single page fetcher for the whole harvest and lends it to one
/// stage at a time: detection, fallback and variant enumeration never
/// overlap.
pub struct StabilityAggregator<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a mut F,
    settings: &'a HarvestSettings,
    trace: &'a TraceLogger,
}

impl<'a, F: PageFetcher + ?Sized> StabilityAggregator<'a, F> {
    pub fn new(fetcher: &'a mut F, settings: &'a HarvestSettings, trace: &'a TraceLogger) -> Self {
        Self {
            fetcher,
            settings,
            trace,
        }
    }

    /// Full harvest: `pass_count` passes, stats, stable set, variants.
    ///
    /// A pass that fails to load is skipped; the harvest only fails when no
    /// pass produced page content at all.
    pub fn run(&mut self, search_url: &str, pass_count: usize) -> Result<HarvestOutcome, HarvestError> {
        let url = Url::parse(search_url)
            .map_err(|e| HarvestError::Config(format!("invalid search url '{search_url}': {e}")))?;

        let keywords = search_keywords(&url);
        info!(url = %url, passes = pass_count, ?keywords, "starting harvest");
        self.trace.log(
            &HarvestEvent::now(HarvestStage::RunStart)
                .with_url(&url)
                .with_count(pass_count)
                .with_detail(keywords.join(" ")),
        );

        let mut snapshots = Vec::new();
        let mut failed_passes = Vec::new();

        for pass in 1..=pass_count {
            info!(pass, of = pass_count, "running pass");
            match self.run_pass(&url, pass) {
                Ok(snapshot) => {
                    info!(pass, products = snapshot.len(), untracked = snapshot.untracked().len(), "pass complete");
                    self.trace.log(
                        &HarvestEvent::now(HarvestStage::PassComplete)
                            .with_pass(pass)
                            .with_count(snapshot.len()),
                    );
                    if self.settings.run.write_runs {
                        if let Err(e) = write_run_file(Path::new(&self.settings.run.output_dir), &snapshot) {
                            warn!(pass, error = %e, "could not write run file, continuing");
                        }
                    }
                    snapshots.push(snapshot);
                }
                Err(e) => {
                    warn!(pass, error = %e, "pass produced no page content");
                    self.trace.log(
                        &HarvestEvent::now(HarvestStage::PassFailed)
                            .with_pass(pass)
                            .with_detail(&e),
                    );
                    failed_passes.push(pass);
                }
            }
        }

        if snapshots.is_empty() {
            return Err(HarvestError::NoPageContent {
                url: url.to_string(),
                passes: pass_count,
            });
        }

        let stats = compute_stats(&snapshots);
        info!(
            unique = stats.unique_asin_count,
            stable = stats.stable_count,
            singletons = stats.singleton_count,
            "aggregated passes"
        );
        self.trace.log(
            &HarvestEvent::now(HarvestStage::Aggregate)
                .with_count(stats.stable_count)
                .with_detail(format!("{} unique", stats.unique_asin_count)),
        );

        let mut records = stable_records(&snapshots);
        if self.settings.variants.enabled {
            self.attach_variants(&mut records);
        }

        self.trace.log(&HarvestEvent::now(HarvestStage::RunComplete).with_count(records.len()));

        Ok(HarvestOutcome {
            records,
            stats,
            snapshots,
            failed_passes,
        })
    }

    /// One pass: load, scroll, detect, resolve, complete. The returned
    /// snapshot is final.
    pub fn run_pass(&mut self, search_url: &Url, pass_index: usize) -> Result<RunSnapshot, FetchError> {
        let fetch = self.settings.fetch.randomized();
        let loaded = self.fetcher.navigate(search_url.as_str(), &fetch)?;
        self.trace.log(
            &HarvestEvent::now(HarvestStage::Navigate)
                .with_pass(pass_index)
                .with_url(search_url),
        );

        if let Err(e) = self
            .fetcher
            .scroll_simulate(fetch.scroll_steps, fetch.scroll_delay_ms)
        {
            debug!(error = %e, "scroll simulation failed, using page as loaded");
        }

        let html = match self.fetcher.content() {
            Ok(html) if !html.trim().is_empty() => html,
            Ok(_) | Err(_) => loaded,
        };
        if html.trim().is_empty() {
            return Err(FetchError::NotLoaded(format!("{search_url} (empty page)")));
        }

        let resolver = FieldResolver::new(search_url, &self.settings.resolve, &self.settings.fetch);

        let cards = {
            let document = Html::parse_document(&html);
            let candidates = detect_cards(&document, &self.settings.detect);

            let mut patterns: Vec<String> = candidates
                .iter()
                .map(|c| c.signature.structure.fingerprint())
                .collect();
            patterns.sort();
            patterns.dedup();

            debug!(pass = pass_index, candidates = candidates.len(), ?patterns, "detected cards");
            self.trace.log(
                &HarvestEvent::now(HarvestStage::Detect)
                    .with_pass(pass_index)
                    .with_count(candidates.len())
                    .with_patterns(patterns),
            );

            resolver.resolve_all(&candidates)
        };

        let incomplete = cards.iter().filter(|c| c.needs_fallback).count();
        self.trace.log(
            &HarvestEvent::now(HarvestStage::Resolve)
                .with_pass(pass_index)
                .with_count(cards.len())
                .with_detail(format!("{incomplete} incomplete")),
        );

        let cards = resolver.complete(cards, &mut *self.fetcher);
        if incomplete > 0 {
            let still_incomplete = cards.iter().filter(|c| c.needs_fallback).count();
            self.trace.log(
                &HarvestEvent::now(HarvestStage::Fallback)
                    .with_pass(pass_index)
                    .with_count(incomplete)
                    .with_detail(format!("{still_incomplete} still incomplete")),
            );
        }

        Ok(RunSnapshot::from_cards(pass_index, cards))
    }

    fn attach_variants(&mut self, records: &mut [FinalRecord]) {
        for record in records.iter_mut() {
            let Some(link) = record.product.link.clone() else {
                debug!(asin = ?record.asin(), "no link, skipping variants");
                continue;
            };

            record.variants =
                extract_variants(&mut *self.fetcher, &link, &self.settings.fetch, &self.settings.variants);

            self.trace.log(
                &HarvestEvent::now(HarvestStage::Variants)
                    .with_url(&link)
                    .with_count(record.variants.len()),
            );
        }
    }
}
