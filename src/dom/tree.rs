use scraper::{ElementRef, Html, Node, Selector};

// ============================================================================
// Parsing & querying (thin layer over `scraper`)
// ============================================================================

/// Parse raw markup into a queryable document.
pub fn parse(markup: &str) -> Html {
    Html::parse_document(markup)
}

/// Parse a selector literal. Invalid selectors yield `None` rather than
/// panicking, so configured anchors can never take a pass down.
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// All descendants of `node` matching `predicate`, in document order.
pub fn query<'a, F>(node: ElementRef<'a>, predicate: F) -> Vec<ElementRef<'a>>
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    node.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| predicate(el))
        .collect()
}

/// Direct element children, skipping text and comment nodes.
pub fn child_elements(node: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    node.children().filter_map(ElementRef::wrap).collect()
}

// ============================================================================
// Attributes
// ============================================================================

pub fn tag_name<'a>(el: &ElementRef<'a>) -> &'a str {
    el.value().name()
}

/// Attribute value, trimmed; empty values count as absent.
pub fn attr<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

pub fn class_tokens<'a>(el: &ElementRef<'a>) -> Vec<&'a str> {
    el.value().classes().collect()
}

/// True when any class token contains one of `needles` (case-insensitive).
pub fn class_contains(el: &ElementRef<'_>, needles: &[&str]) -> bool {
    el.value().classes().any(|class| {
        let lower = class.to_lowercase();
        needles.iter().any(|n| lower.contains(n))
    })
}

// ============================================================================
// Visibility
// ============================================================================

const HIDDEN_CLASSES: &[&str] = &["hidden", "aok-hidden", "a-hidden"];

/// Whether the element is hidden by inline style, ARIA or the `hidden`
/// attribute. Only the element itself is inspected, never its ancestors.
pub fn is_visible(el: &ElementRef<'_>) -> bool {
    let style: String = el
        .value()
        .attr("style")
        .unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();

    if style.contains("display:none") || style.contains("visibility:hidden") {
        return false;
    }

    if el
        .value()
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return false;
    }

    if el.value().attr("hidden").is_some() {
        return false;
    }

    !el.value().classes().any(|c| HIDDEN_CLASSES.contains(&c))
}

// ============================================================================
// Text
// ============================================================================

pub fn normalize_ws(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the element's direct text children only.
pub fn own_text(el: &ElementRef<'_>) -> String {
    let joined = el
        .children()
        .filter_map(|child| match child.value() {
            Node::Text(text) => {
                let s: &str = text;
                Some(s)
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ");
    normalize_ws(&joined)
}

/// Full descendant text with whitespace collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Every non-blank descendant text node, in document order.
pub fn text_nodes<'a>(el: &ElementRef<'a>) -> Vec<&'a str> {
    el.text().map(str::trim).filter(|t| !t.is_empty()).collect()
}

// ============================================================================
// Ancestry
// ============================================================================

/// True when `ancestor` is a strict ancestor of `el`.
pub fn is_ancestor_of(ancestor: &ElementRef<'_>, el: &ElementRef<'_>) -> bool {
    let target = (**ancestor).id();
    el.ancestors().any(|node| node.id() == target)
}
