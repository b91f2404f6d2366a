use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::detect::card_model::ProductCard;
use crate::variant::variant_model::VariantCombination;

// ============================================================================
// Per-pass snapshot
// ============================================================================

/// The products extracted in one pass, frozen once the pass completes.
///
/// Tracked products are keyed by asin and keep insertion order; a repeated
/// asin overwrites its earlier entry in place. Cards that never resolved an
/// asin are kept aside and take no part in stability accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSnapshot {
    pub pass_index: usize,
    products: Vec<ProductCard>,
    untracked: Vec<ProductCard>,
}

impl RunSnapshot {
    pub fn new(pass_index: usize) -> Self {
        Self {
            pass_index,
            ..Self::default()
        }
    }

    /// Rebuild a snapshot from the cards of a run file.
    pub fn from_cards(pass_index: usize, cards: impl IntoIterator<Item = ProductCard>) -> Self {
        let mut snapshot = Self::new(pass_index);
        for card in cards {
            snapshot.insert(card);
        }
        snapshot
    }

    pub fn insert(&mut self, card: ProductCard) {
        let Some(asin) = card.asin.as_deref() else {
            self.untracked.push(card);
            return;
        };

        match self
            .products
            .iter()
            .position(|p| p.asin.as_deref() == Some(asin))
        {
            Some(i) => self.products[i] = card,
            None => self.products.push(card),
        }
    }

    pub fn products(&self) -> &[ProductCard] {
        &self.products
    }

    pub fn untracked(&self) -> &[ProductCard] {
        &self.untracked
    }

    pub fn get(&self, asin: &str) -> Option<&ProductCard> {
        self.products.iter().find(|p| p.asin.as_deref() == Some(asin))
    }

    pub fn contains(&self, asin: &str) -> bool {
        self.get(asin).is_some()
    }

    pub fn asins(&self) -> impl Iterator<Item = &str> {
        self.products.iter().filter_map(|p| p.asin.as_deref())
    }

    /// Number of distinct asins in this pass.
    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Contents of the run file: tracked cards, then untracked ones.
    pub fn run_file_cards(&self) -> Vec<&ProductCard> {
        self.products.iter().chain(&self.untracked).collect()
    }
}

// ============================================================================
// Stability statistics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityStats {
    pub run_count: usize,
    pub unique_asin_count: usize,
    pub avg_per_run: f64,
    pub max_per_run: usize,
    pub min_per_run: usize,
    pub singleton_count: usize,
    pub stable_count: usize,
    /// Asins seen in exactly one pass, in first-seen order.
    pub singleton_asins: Vec<String>,
    /// Asins seen in every pass, in first-pass order.
    pub stable_asins: Vec<String>,
}

// ============================================================================
// Final output
// ============================================================================

/// A stable product with its variant combinations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalRecord {
    pub product: ProductCard,
    pub variants: Vec<VariantCombination>,
}

impl FinalRecord {
    pub fn asin(&self) -> Option<&str> {
        self.product.asin.as_deref()
    }
}

/// Flat `{asin, title, price, link, image, variants}` object.
impl Serialize for FinalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("FinalRecord", 6)?;
        record.serialize_field("asin", &self.product.asin)?;
        record.serialize_field("title", &self.product.title)?;
        record.serialize_field("price", &self.product.price)?;
        record.serialize_field("link", &self.product.link)?;
        record.serialize_field("image", &self.product.image)?;
        record.serialize_field("variants", &self.variants)?;
        record.end()
    }
}

// ============================================================================
// Harvest configuration & outcome
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub passes: usize,
    /// Directory receiving `run{n}.json`, `final.json` and `stats.json`.
    pub output_dir: String,
    /// Write the per-pass run files as each pass completes. Off for library
    /// callers; the `run` subcommand turns it on.
    pub write_runs: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            passes: 2,
            output_dir: "outputs".to_string(),
            write_runs: false,
        }
    }
}

/// Everything one harvest produced.
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub records: Vec<FinalRecord>,
    pub stats: StabilityStats,
    pub snapshots: Vec<RunSnapshot>,
    /// Passes that produced no page content.
    pub failed_passes: Vec<usize>,
}
