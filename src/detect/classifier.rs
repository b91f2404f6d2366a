use std::collections::HashMap;
use std::hash::Hash;

use scraper::{ElementRef, Html};
use tracing::debug;

use crate::detect::card_model::{CardCandidate, CardFeatures, DetectConfig};
use crate::detect::patterns::{is_price_text, is_title_like};
use crate::detect::signature::{ClassSignature, Signature, StructureSignature, signature};
use crate::dom::tree::{child_elements, class_contains, is_ancestor_of, is_visible, query, tag_name, text_nodes};

// ============================================================================
// Pattern selection
// ============================================================================

/// The dominant signatures among a container's children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DominantPatterns {
    pub structures: Vec<StructureSignature>,
    pub classes: Vec<ClassSignature>,
}

impl DominantPatterns {
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty() && self.classes.is_empty()
    }

    pub fn matches(&self, sig: &Signature) -> bool {
        self.structures.contains(&sig.structure) || self.classes.contains(&sig.class)
    }
}

/// Values whose frequency equals the histogram mode, in first-seen order.
///
/// Ties keep every modal value. A mode below `min_repeats` is not a
/// repeated pattern and yields an empty set.
pub fn modal_set<T>(values: &[T], min_repeats: usize) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut counts: HashMap<&T, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }

    let mode = match counts.values().max() {
        Some(&m) if m >= min_repeats.max(1) => m,
        _ => return Vec::new(),
    };

    let mut modal: Vec<T> = Vec::new();
    for value in values {
        if counts.get(value) == Some(&mode) && !modal.contains(value) {
            modal.push(value.clone());
        }
    }
    modal
}

/// Histogram both signature kinds separately; empty signatures carry no
/// pattern and are not counted.
pub fn dominant_patterns(signatures: &[Signature], min_repeats: usize) -> DominantPatterns {
    let structures: Vec<StructureSignature> = signatures
        .iter()
        .filter(|s| !s.structure.is_empty())
        .map(|s| s.structure.clone())
        .collect();
    let classes: Vec<ClassSignature> = signatures
        .iter()
        .filter(|s| !s.class.is_empty())
        .map(|s| s.class.clone())
        .collect();

    DominantPatterns {
        structures: modal_set(&structures, min_repeats),
        classes: modal_set(&classes, min_repeats),
    }
}

// ============================================================================
// Card features
// ============================================================================

pub fn card_features(el: &ElementRef<'_>) -> CardFeatures {
    CardFeatures {
        has_price: text_nodes(el).iter().any(|t| is_price_text(t)),
        has_image: !query(*el, |d| tag_name(d) == "img").is_empty(),
        has_title: !query(*el, is_title_like).is_empty(),
    }
}

// ============================================================================
// Container classification
// ============================================================================

/// Classify the direct children of `container`, returning the ones that look
/// like product cards in DOM order.
///
/// Returns an empty vector when fewer than two children carry an extractable
/// signature: there is no repeated pattern to speak of here.
pub fn classify<'a>(container: ElementRef<'a>, config: &DetectConfig) -> Vec<CardCandidate<'a>> {
    let children: Vec<(ElementRef<'a>, Signature)> = child_elements(container)
        .into_iter()
        .map(|child| {
            let sig = signature(&child);
            (child, sig)
        })
        .collect();

    let extractable = children.iter().filter(|(_, sig)| sig.is_extractable()).count();
    if extractable < 2 {
        return Vec::new();
    }

    let signatures: Vec<Signature> = children.iter().map(|(_, sig)| sig.clone()).collect();
    let patterns = dominant_patterns(&signatures, config.min_pattern_repeats);
    if patterns.is_empty() {
        return Vec::new();
    }

    children
        .into_iter()
        .filter(|(child, sig)| is_visible(child) && patterns.matches(sig))
        .filter_map(|(child, sig)| {
            let features = card_features(&child);
            (features.count() >= config.min_features).then_some(CardCandidate {
                element: child,
                signature: sig,
                features,
            })
        })
        .collect()
}

// ============================================================================
// Page-level detection
// ============================================================================

/// Every element whose class attribute hints at a listing container, in
/// document order.
pub fn find_containers<'a>(document: &'a Html, keywords: &[String]) -> Vec<ElementRef<'a>> {
    let needles: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
    let needles: Vec<&str> = needles.iter().map(String::as_str).collect();

    query(document.root_element(), |el| class_contains(el, &needles))
}

/// Run classification over every candidate container of the page.
///
/// A candidate nested inside (or wrapping) one already accepted is the same
/// listing seen at another depth and is dropped.
pub fn detect_cards<'a>(document: &'a Html, config: &DetectConfig) -> Vec<CardCandidate<'a>> {
    let mut accepted: Vec<CardCandidate<'a>> = Vec::new();

    let containers = find_containers(document, &config.container_keywords);
    debug!(containers = containers.len(), "candidate containers found");

    for container in containers {
        for candidate in classify(container, config) {
            let overlaps = accepted.iter().any(|prev| {
                is_ancestor_of(&prev.element, &candidate.element)
                    || is_ancestor_of(&candidate.element, &prev.element)
                    || (*prev.element).id() == (*candidate.element).id()
            });
            if !overlaps {
                accepted.push(candidate);
            }
        }
    }

    accepted
}
