use crate::detect::card_model::ProductCard;
use crate::stability::stability_model::{FinalRecord, HarvestOutcome, StabilityStats};

// ============================================================================
// Console reporter — formatted terminal output
// ============================================================================

/// Format a finished harvest for terminal output.
///
/// Produces output like:
/// ```text
/// === Harvest: 3 passes, 2 stable of 4 unique ===
///
/// Pass 1: 3 products
/// Pass 2: 2 products
/// Pass 3: 3 products (1 untracked)
///
/// ✓ B001234567  Wireless Headphones  $29.99  (4 variants)
/// ✓ B007654321  Studio Headset  -
///
/// avg 2.7 / min 2 / max 3 per pass, 2 seen once
/// ```
pub fn format_harvest_report(outcome: &HarvestOutcome) -> String {
    let stats = &outcome.stats;
    let mut out = String::new();

    out.push_str(&format!(
        "=== Harvest: {} passes, {} stable of {} unique ===\n\n",
        stats.run_count, stats.stable_count, stats.unique_asin_count
    ));

    for snapshot in &outcome.snapshots {
        out.push_str(&format!("Pass {}: {} products", snapshot.pass_index, snapshot.len()));
        if !snapshot.untracked().is_empty() {
            out.push_str(&format!(" ({} untracked)", snapshot.untracked().len()));
        }
        out.push('\n');
    }
    for pass in &outcome.failed_passes {
        out.push_str(&format!("Pass {}: no page content\n", pass));
    }

    if !outcome.records.is_empty() {
        out.push('\n');
        for record in &outcome.records {
            out.push_str(&format_record(record));
        }
    }

    out.push('\n');
    out.push_str(&format_stats_line(stats));
    out
}

/// Stats-only summary, for aggregating run files from disk.
pub fn format_stats_report(stats: &StabilityStats, records: &[FinalRecord]) -> String {
    let mut out = format!(
        "=== Aggregate: {} runs, {} stable of {} unique ===\n\n",
        stats.run_count, stats.stable_count, stats.unique_asin_count
    );
    for record in records {
        out.push_str(&format_record(record));
    }
    if !records.is_empty() {
        out.push('\n');
    }
    out.push_str(&format_stats_line(stats));
    out
}

/// One line per detected card, with the fields still missing.
pub fn format_cards(cards: &[ProductCard]) -> String {
    let mut out = format!("=== Detected {} cards ===\n\n", cards.len());
    for card in cards {
        let marker = if card.needs_fallback { "\u{2717}" } else { "\u{2713}" };
        out.push_str(&format!(
            "{} {}  {}  {}",
            marker,
            card.asin.as_deref().unwrap_or("----------"),
            card.title.as_deref().map(truncate).unwrap_or_default(),
            card.price.as_deref().unwrap_or("-"),
        ));
        if card.needs_fallback {
            out.push_str(&format!("  [missing: {}]", card.missing_fields().join(", ")));
        }
        out.push('\n');
    }
    out
}

fn format_record(record: &FinalRecord) -> String {
    let mut line = format!(
        "\u{2713} {}  {}  {}",
        record.asin().unwrap_or("-"),
        record.product.title.as_deref().map(truncate).unwrap_or_default(),
        record.product.price.as_deref().unwrap_or("-"),
    );
    if !record.variants.is_empty() {
        line.push_str(&format!("  ({} variants)", record.variants.len()));
    }
    line.push('\n');
    line
}

fn format_stats_line(stats: &StabilityStats) -> String {
    format!(
        "avg {:.1} / min {} / max {} per pass, {} seen once\n",
        stats.avg_per_run, stats.min_per_run, stats.max_per_run, stats.singleton_count
    )
}

const TITLE_WIDTH: usize = 60;

fn truncate(title: &str) -> String {
    if title.chars().count() <= TITLE_WIDTH {
        return title.to_string();
    }
    let cut: String = title.chars().take(TITLE_WIDTH - 3).collect();
    format!("{cut}...")
}
