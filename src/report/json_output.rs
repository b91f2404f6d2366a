use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::detect::card_model::ProductCard;
use crate::error::HarvestError;
use crate::stability::stability_model::{FinalRecord, HarvestOutcome, RunSnapshot, StabilityStats};

// ============================================================================
// Artifact names
// ============================================================================

pub const FINAL_FILE: &str = "final.json";
pub const STATS_FILE: &str = "stats.json";

pub fn run_file_name(pass_index: usize) -> String {
    format!("run{pass_index}.json")
}

/// Pass index of a `run{n}.json` file name.
pub fn parse_run_file_name(name: &str) -> Option<usize> {
    name.strip_prefix("run")?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

// ============================================================================
// Writing
// ============================================================================

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| HarvestError::Output {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| HarvestError::Json {
        context: path.display().to_string(),
        source: e,
    })?;

    fs::write(path, json).map_err(|e| HarvestError::Output {
        path: path.display().to_string(),
        source: e,
    })?;

    debug!(path = %path.display(), "wrote artifact");
    Ok(())
}

/// `run{n}.json`: tracked cards, then untracked ones.
pub fn write_run_file(dir: &Path, snapshot: &RunSnapshot) -> Result<PathBuf, HarvestError> {
    let path = dir.join(run_file_name(snapshot.pass_index));
    write_json(&path, &snapshot.run_file_cards())?;
    Ok(path)
}

pub fn write_final(dir: &Path, records: &[FinalRecord]) -> Result<PathBuf, HarvestError> {
    let path = dir.join(FINAL_FILE);
    write_json(&path, records)?;
    Ok(path)
}

pub fn write_stats(dir: &Path, stats: &StabilityStats) -> Result<PathBuf, HarvestError> {
    let path = dir.join(STATS_FILE);
    write_json(&path, stats)?;
    Ok(path)
}

/// Write `final.json` and `stats.json` for a finished harvest.
pub fn write_outcome(dir: &Path, outcome: &HarvestOutcome) -> Result<(), HarvestError> {
    write_final(dir, &outcome.records)?;
    write_stats(dir, &outcome.stats)?;
    info!(dir = %dir.display(), records = outcome.records.len(), "wrote harvest output");
    Ok(())
}

// ============================================================================
// Reading
// ============================================================================

pub fn read_run_file(path: &Path, pass_index: usize) -> Result<RunSnapshot, HarvestError> {
    let content = fs::read_to_string(path).map_err(|e| HarvestError::Input {
        path: path.display().to_string(),
        source: e,
    })?;

    let cards: Vec<ProductCard> = serde_json::from_str(&content).map_err(|e| HarvestError::Json {
        context: path.display().to_string(),
        source: e,
    })?;

    Ok(RunSnapshot::from_cards(pass_index, cards))
}

/// Every `run{n}.json` in `dir`, ordered by pass index.
pub fn load_run_files(dir: &Path) -> Result<Vec<RunSnapshot>, HarvestError> {
    let entries = fs::read_dir(dir).map_err(|e| HarvestError::Input {
        path: dir.display().to_string(),
        source: e,
    })?;

    let mut runs: Vec<(usize, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = parse_run_file_name(name.to_str()?)?;
            Some((index, entry.path()))
        })
        .collect();
    runs.sort_by_key(|(index, _)| *index);

    runs.iter()
        .map(|(index, path)| read_run_file(path, *index))
        .collect()
}
