use crate::{
    browser::fetcher::PageFetcher,
    error::HarvestError,
    stability::{
        aggregator::{HarvestSettings, StabilityAggregator},
        stability_model::{FinalRecord, StabilityStats},
    },
    trace::logger::TraceLogger,
};

pub mod browser;
pub mod cli;
pub mod detect;
pub mod dom;
pub mod error;
pub mod extract;
pub mod report;
pub mod stability;
pub mod trace;
pub mod variant;

/// Harvest `search_url` over `pass_count` passes and return the stable
/// products with their variants, plus the stability statistics.
///
/// Nothing is written to disk unless `settings.run.write_runs` is set.
pub fn harvest<F>(
    fetcher: &mut F,
    search_url: &str,
    pass_count: usize,
    settings: &HarvestSettings,
) -> Result<(Vec<FinalRecord>, StabilityStats), HarvestError>
where
    F: PageFetcher + ?Sized,
{
    let trace = TraceLogger::disabled();
    let outcome = StabilityAggregator::new(fetcher, settings, &trace).run(search_url, pass_count)?;
    Ok((outcome.records, outcome.stats))
}
