use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::dom::anchor::DomAnchor;
use crate::extract::fields::DelayRange;

// ============================================================================
// Variant dimensions discovered on a detail page
// ============================================================================

/// One selectable option. `anchor` is only valid on the page it was
/// discovered on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOption {
    pub value: String,
    /// Per-option identity token (a child ASIN, a data value or an id).
    pub token: String,
    pub anchor: DomAnchor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDimension {
    pub label: String,
    pub options: Vec<VariantOption>,
}

// ============================================================================
// Enumerated combinations
// ============================================================================

/// Ordered label → value mapping; serializes as a JSON object in dimension
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment(pub Vec<(String, String)>);

impl Assignment {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Assignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, value) in &self.0 {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantCombination {
    pub assignment: Assignment,
    /// `None` when the price could not be read for this combination.
    pub price: Option<String>,
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    pub enabled: bool,
    /// Dimension labels looked for on detail pages, e.g. `Color` in `Color:`.
    pub dimension_labels: Vec<String>,
    /// Selector of the region whose update marks a selection as applied.
    pub price_region: String,
    pub await_timeout_ms: u64,
    /// Navigation attempts for the detail page before giving up.
    pub attempts: u32,
    /// Humanized pause before each option click.
    pub option_delay: DelayRange,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dimension_labels: ["Color", "Colour", "Size", "Style", "Pattern", "Configuration"]
                .iter()
                .map(|l| l.to_string())
                .collect(),
            price_region: "#corePrice_feature_div, #corePriceDisplay_desktop_feature_div, #apex_desktop"
                .to_string(),
            await_timeout_ms: 5_000,
            attempts: 3,
            option_delay: DelayRange {
                min_ms: 100,
                max_ms: 500,
            },
        }
    }
}
