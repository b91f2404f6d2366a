use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use serde::{Deserialize, Serialize};

static SIMPLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("valid id regex"));

/// Opaque back-reference to a node of the page currently loaded in the
/// fetcher.
///
/// Holds a CSS selector, never the tree itself. It is only meaningful while
/// the page it was computed from stays loaded; anchors are never carried
/// across navigations or passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomAnchor(String);

impl DomAnchor {
    pub fn from_selector(selector: impl Into<String>) -> Self {
        DomAnchor(selector.into())
    }

    /// Build a locator for `el`: its own id when usable, otherwise an
    /// `nth-child` path rooted at the nearest ancestor with a usable id (or
    /// at `html`).
    pub fn for_element(el: &ElementRef<'_>) -> Self {
        if let Some(id) = usable_id(el) {
            return DomAnchor(format!("#{id}"));
        }

        let mut steps = vec![path_step(el)];
        let mut current = el.parent().and_then(ElementRef::wrap);

        while let Some(node) = current {
            if let Some(id) = usable_id(&node) {
                steps.push(format!("#{id}"));
                break;
            }
            if node.parent().and_then(ElementRef::wrap).is_none() {
                steps.push(node.value().name().to_string());
                break;
            }
            steps.push(path_step(&node));
            current = node.parent().and_then(ElementRef::wrap);
        }

        steps.reverse();
        DomAnchor(steps.join(" > "))
    }

    pub fn selector(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn usable_id<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    el.value().id().filter(|id| SIMPLE_ID.is_match(id))
}

fn path_step(el: &ElementRef<'_>) -> String {
    let position = el
        .prev_siblings()
        .filter(|sibling| sibling.value().is_element())
        .count()
        + 1;
    format!("{}:nth-child({})", el.value().name(), position)
}
