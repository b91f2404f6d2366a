use scraper::ElementRef;
use serde::{Deserialize, Serialize};

use crate::detect::signature::Signature;

// ============================================================================
// Detection output
// ============================================================================

/// A product listing extracted from a result page.
///
/// `asin` is the identity key across passes; a card without one can still be
/// reported but never takes part in stability accounting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCard {
    pub asin: Option<String>,
    pub title: Option<String>,
    pub price: Option<String>,
    pub link: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub needs_fallback: bool,
}

impl ProductCard {
    pub fn empty() -> Self {
        Self {
            asin: None,
            title: None,
            price: None,
            link: None,
            image: None,
            needs_fallback: true,
        }
    }

    /// Names of the canonical fields that are still missing.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.asin.is_none() {
            missing.push("asin");
        }
        if self.title.is_none() {
            missing.push("title");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        if self.link.is_none() {
            missing.push("link");
        }
        if self.image.is_none() {
            missing.push("image");
        }
        missing
    }

    pub fn refresh_needs_fallback(&mut self) {
        self.needs_fallback = !self.missing_fields().is_empty();
    }
}

/// Which product features a candidate node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CardFeatures {
    pub has_price: bool,
    pub has_image: bool,
    pub has_title: bool,
}

impl CardFeatures {
    pub fn count(&self) -> usize {
        [self.has_price, self.has_image, self.has_title]
            .iter()
            .filter(|present| **present)
            .count()
    }
}

/// A child node that passed classification; borrowed from the parsed page.
#[derive(Debug, Clone)]
pub struct CardCandidate<'a> {
    pub element: ElementRef<'a>,
    pub signature: Signature,
    pub features: CardFeatures,
}

// ============================================================================
// Detection configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectConfig {
    /// Class-attribute substrings that mark a node as a candidate container.
    pub container_keywords: Vec<String>,
    /// Minimum frequency for a modal signature to count; 1 keeps the plain mode.
    pub min_pattern_repeats: usize,
    /// How many of {price, image, title} a card must carry.
    pub min_features: usize,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            container_keywords: ["grid", "result", "items", "products", "list", "slot", "card"]
                .iter()
                .map(|k| k.to_string())
                .collect(),
            min_pattern_repeats: 1,
            min_features: 2,
        }
    }
}
