use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::stability::aggregator::HarvestSettings;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "shelf-scan",
    version,
    about = "Product listing harvester with cross-run stability checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: shelf-scan.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append a JSONL trace of pipeline events to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Harvest a search page over several passes and keep the stable products
    Run {
        /// Search results URL
        #[arg(long)]
        url: String,

        /// Number of passes (overrides config)
        #[arg(long)]
        passes: Option<usize>,

        /// Page fetcher to use (overrides config)
        #[arg(long, value_enum)]
        fetcher: Option<FetcherKind>,

        /// Output directory for run, final and stats files (overrides config)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Skip variant enumeration for stable products
        #[arg(long)]
        no_variants: bool,

        /// Skip the detail page fallback for incomplete cards
        #[arg(long)]
        no_fallback: bool,
    },

    /// Detect product cards in a saved search page, without fetching
    Detect {
        /// Path to a saved HTML page
        #[arg(long)]
        html: String,

        /// URL the page was saved from; relative links resolve against it
        #[arg(long, default_value = "https://www.amazon.com/s")]
        url: String,

        /// Output format: console or json
        #[arg(long, default_value = "console")]
        format: String,
    },

    /// Recompute stats and the stable set from existing run files
    Aggregate {
        /// Directory holding run{n}.json files
        #[arg(long, default_value = "outputs")]
        dir: String,

        /// Where to write final.json and stats.json (default: same directory)
        #[arg(short, long)]
        output_dir: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Headless browser driven through the Node.js session server
    Browser,
    /// Plain HTTP GET, no interaction (variants unavailable)
    Http,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `shelf-scan.yaml`
///
/// Pipeline sections (`fetch`, `detect`, `resolve`, `variants`, `run`) sit at
/// the top level next to `browser`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(flatten)]
    pub harvest: HarvestSettings,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default = "default_fetcher")]
    pub fetcher: FetcherKind,

    /// Node.js script serving the browser session protocol
    #[serde(default = "default_script")]
    pub script: String,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            fetcher: default_fetcher(),
            script: default_script(),
        }
    }
}

// Serde default helpers
fn default_fetcher() -> FetcherKind { FetcherKind::Browser }
fn default_script() -> String { "browser/server.js".to_string() }

pub const DEFAULT_CONFIG_PATH: &str = "shelf-scan.yaml";

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// CLI flags that override the `run` subcommand's config sections.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub passes: Option<usize>,
    pub output_dir: Option<String>,
    pub no_variants: bool,
    pub no_fallback: bool,
}

/// Build the harvest settings from resolved CLI/config values.
pub fn build_harvest_settings(config: &AppConfig, overrides: &RunOverrides) -> HarvestSettings {
    let mut settings = config.harvest.clone();

    if let Some(passes) = overrides.passes {
        settings.run.passes = passes;
    }
    if let Some(dir) = &overrides.output_dir {
        settings.run.output_dir = dir.clone();
    }
    if overrides.no_variants {
        settings.variants.enabled = false;
    }
    if overrides.no_fallback {
        settings.resolve.fallback_enabled = false;
    }
    settings.run.passes = settings.run.passes.max(1);
    settings
}

/// `-v` count to a default `tracing` filter directive.
pub fn log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
