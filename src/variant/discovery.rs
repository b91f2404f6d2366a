use regex::{Regex, RegexBuilder};
use scraper::{ElementRef, Html};

use crate::dom::anchor::DomAnchor;
use crate::dom::tree::{attr, element_text, is_ancestor_of, is_visible, own_text, query, tag_name};
use crate::variant::variant_model::{VariantDimension, VariantOption};

/// Attributes that give an option its own identity, most specific first.
const IDENTITY_ATTRS: &[&str] = &[
    "data-defaultasin",
    "data-asin",
    "data-value",
    "data-dp-url",
    "value",
    "id",
];

const OPTION_TAGS: &[&str] = &["li", "button", "option"];

/// How far above a label the option list may sit.
const MAX_SECTION_DEPTH: usize = 4;

const SELECT_PREFIX: &str = "Click to select ";

/// Scan a detail page for variant dimensions.
///
/// A dimension is a `Label:` text from the vocabulary followed by a list of
/// selectable options carrying an identity token. Dimensions come back in
/// document order; options in DOM order. Each label is reported once.
pub fn discover_dimensions(document: &Html, labels: &[String]) -> Vec<VariantDimension> {
    let Some(label_pattern) = label_regex(labels) else {
        return Vec::new();
    };

    let label_elements: Vec<(ElementRef<'_>, String)> = query(document.root_element(), |el| {
        !matches!(tag_name(el), "script" | "style")
    })
    .into_iter()
    .filter_map(|el| {
        let text = own_text(&el);
        let caps = label_pattern.captures(&text)?;
        Some((el, canonical_label(&caps[1], labels)))
    })
    .collect();

    let mut dimensions: Vec<VariantDimension> = Vec::new();

    for (label_el, label) in &label_elements {
        if dimensions.iter().any(|d| &d.label == label) {
            continue;
        }

        let other_labels: Vec<ElementRef<'_>> = label_elements
            .iter()
            .filter(|(el, other)| other != label && (**el).id() != (**label_el).id())
            .map(|(el, _)| *el)
            .collect();

        if let Some(options) = find_options(label_el, &other_labels) {
            dimensions.push(VariantDimension {
                label: label.clone(),
                options,
            });
        }
    }

    dimensions
}

fn label_regex(labels: &[String]) -> Option<Regex> {
    if labels.is_empty() {
        return None;
    }
    let alternatives = labels
        .iter()
        .map(|l| regex::escape(l))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"^\s*({alternatives})\s*:"))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Map a matched label back to its vocabulary spelling.
fn canonical_label(matched: &str, labels: &[String]) -> String {
    labels
        .iter()
        .find(|l| l.eq_ignore_ascii_case(matched))
        .cloned()
        .unwrap_or_else(|| matched.to_string())
}

/// Find the option list belonging to a label.
///
/// At each level, starting from the label itself, the following siblings are
/// scanned up to the next dimension's label; failing that the parent is
/// searched as a whole, unless it would swallow another dimension's label.
fn find_options(label_el: &ElementRef<'_>, other_labels: &[ElementRef<'_>]) -> Option<Vec<VariantOption>> {
    let mut node = *label_el;

    for _ in 0..MAX_SECTION_DEPTH {
        let options = following_options(&node, other_labels);
        if !options.is_empty() {
            return Some(options);
        }

        let section = node.parent().and_then(ElementRef::wrap)?;
        if other_labels.iter().any(|other| is_ancestor_of(&section, other)) {
            return None;
        }

        let options = collect_options(&section);
        if !options.is_empty() {
            return Some(options);
        }
        node = section;
    }

    None
}

/// Options in the siblings after `node`, stopping at the next label.
fn following_options(node: &ElementRef<'_>, other_labels: &[ElementRef<'_>]) -> Vec<VariantOption> {
    let mut options = Vec::new();

    for sibling in node.next_siblings().filter_map(ElementRef::wrap) {
        let starts_next_section = other_labels
            .iter()
            .any(|other| (**other).id() == (*sibling).id() || is_ancestor_of(&sibling, other));
        if starts_next_section {
            break;
        }

        if is_option_element(&sibling) {
            options.extend(to_option(&sibling));
        } else {
            options.extend(collect_options(&sibling));
        }
    }

    options
}

fn is_option_element(el: &ElementRef<'_>) -> bool {
    (OPTION_TAGS.contains(&tag_name(el)) || attr(el, "role") == Some("button"))
        && identity_token(el).is_some()
        && is_visible(el)
}

fn collect_options(section: &ElementRef<'_>) -> Vec<VariantOption> {
    let candidates = query(*section, is_option_element);

    // Nested option elements (an li wrapping a button) collapse to the outermost.
    candidates
        .iter()
        .filter(|el| !candidates.iter().any(|outer| is_ancestor_of(outer, el)))
        .filter_map(to_option)
        .collect()
}

fn to_option(el: &ElementRef<'_>) -> Option<VariantOption> {
    let token = identity_token(el)?.to_string();
    Some(VariantOption {
        value: option_value(el).unwrap_or_else(|| token.clone()),
        token,
        anchor: DomAnchor::for_element(el),
    })
}

fn identity_token<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    IDENTITY_ATTRS.iter().find_map(|name| attr(el, name))
}

/// Human value of an option: its title (minus the "Click to select" prompt),
/// the alt text of its swatch image, or its visible text.
fn option_value(el: &ElementRef<'_>) -> Option<String> {
    if let Some(title) = attr(el, "title") {
        let value = title.strip_prefix(SELECT_PREFIX).unwrap_or(title).trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    if let Some(alt) = query(*el, |d| tag_name(d) == "img")
        .iter()
        .find_map(|img| attr(img, "alt"))
    {
        return Some(alt.to_string());
    }

    let text = element_text(el);
    (!text.is_empty()).then_some(text)
}
