use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::browser::fetch_config::FetchConfig;
use crate::dom::anchor::DomAnchor;
use crate::error::FetchError;

// ============================================================================
// PageFetcher trait — the page fetching / interaction capability
// ============================================================================

/// How to act on an anchored element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractAction {
    Click,
    Hover,
    ScrollIntoView,
}

impl InteractAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractAction::Click => "click",
            InteractAction::Hover => "hover",
            InteractAction::ScrollIntoView => "scroll_into_view",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractOutcome {
    Performed,
    /// The anchor no longer resolves on the current page.
    NotFound,
}

/// A single page/context owned by whichever stage is active.
///
/// Every method that waits on the page carries its own timeout; a timeout
/// surfaces as an error (or `false` from `await_update`) and never blocks
/// indefinitely.
pub trait PageFetcher {
    /// Load `url` and return its rendered markup.
    fn navigate(&mut self, url: &str, config: &FetchConfig) -> Result<String, FetchError>;

    /// Markup of the currently loaded page, reflecting any interaction since
    /// navigation.
    fn content(&mut self) -> Result<String, FetchError>;

    /// Scroll through the page to trigger lazy-loaded content.
    fn scroll_simulate(&mut self, steps: u32, delay_ms: u64) -> Result<(), FetchError>;

    fn interact(
        &mut self,
        anchor: &DomAnchor,
        action: InteractAction,
    ) -> Result<InteractOutcome, FetchError>;

    /// Wait for the region matched by `region_selector` to settle after an
    /// interaction. `Ok(false)` means the timeout elapsed first.
    fn await_update(&mut self, region_selector: &str, timeout: Duration) -> Result<bool, FetchError>;

    /// Text of the first element matching `selector`, `None` if absent.
    fn query_text(&mut self, selector: &str) -> Result<Option<String>, FetchError>;
}
