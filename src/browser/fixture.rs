use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::{InteractAction, InteractOutcome, PageFetcher};
use crate::dom::anchor::DomAnchor;
use crate::dom::tree::{element_text, parse, selector};
use crate::error::FetchError;

/// In-memory fetcher serving canned markup.
///
/// Used for offline detection of saved pages and as a deterministic stand-in
/// for a browser. Each URL holds a sequence of page versions; successive
/// navigations step through it and then keep returning the last one, which
/// models a listing page that shifts between passes. Clicking an anchor can
/// rewrite the text of other selectors (a price region, for instance).
#[derive(Debug, Default, Clone)]
pub struct FixtureFetcher {
    pages: HashMap<String, Vec<String>>,
    visits: HashMap<String, usize>,
    default_page: Option<String>,
    failing: HashSet<String>,
    click_effects: HashMap<String, Vec<(String, String)>>,
    stalled: HashSet<String>,
    broken: HashSet<String>,
    current: Option<String>,
    overrides: HashMap<String, String>,
    last_clicked: Option<String>,
    navigations: Vec<String>,
    clicks: Vec<String>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for any URL without a dedicated page.
    pub fn single_page(html: impl Into<String>) -> Self {
        Self {
            default_page: Some(html.into()),
            ..Self::default()
        }
    }

    /// Serve `html` for `url`; repeated calls queue later versions.
    pub fn with_page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.pages.entry(url.to_string()).or_default().push(html.into());
        self
    }

    /// Navigating to `url` fails as if the network timed out.
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// After clicking `anchor`, `selector` reads as `text`.
    pub fn with_click_effect(mut self, anchor: &str, selector: &str, text: &str) -> Self {
        self.click_effects
            .entry(anchor.to_string())
            .or_default()
            .push((selector.to_string(), text.to_string()));
        self
    }

    /// After clicking `anchor` the page never settles.
    pub fn with_stalled_click(mut self, anchor: &str) -> Self {
        self.stalled.insert(anchor.to_string());
        self
    }

    /// Clicking `anchor` raises an interaction error.
    pub fn with_broken_click(mut self, anchor: &str) -> Self {
        self.broken.insert(anchor.to_string());
        self
    }

    /// Every URL navigated to, in order.
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Every anchor clicked, in order.
    pub fn clicks(&self) -> &[String] {
        &self.clicks
    }

    fn page_for(&mut self, url: &str) -> Option<String> {
        match self.pages.get(url) {
            Some(versions) if !versions.is_empty() => {
                let visit = self.visits.entry(url.to_string()).or_insert(0);
                let index = (*visit).min(versions.len() - 1);
                *visit += 1;
                Some(versions[index].clone())
            }
            _ => self.default_page.clone(),
        }
    }
}

impl PageFetcher for FixtureFetcher {
    fn navigate(&mut self, url: &str, config: &FetchConfig) -> Result<String, FetchError> {
        self.navigations.push(url.to_string());
        self.overrides.clear();
        self.last_clicked = None;

        if self.failing.contains(url) {
            self.current = None;
            return Err(FetchError::Timeout {
                context: format!("navigate {url}"),
                timeout_ms: config.navigation_timeout_ms,
            });
        }

        match self.page_for(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(html)
            }
            None => {
                self.current = None;
                Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: 404,
                })
            }
        }
    }

    fn content(&mut self) -> Result<String, FetchError> {
        self.current
            .clone()
            .ok_or_else(|| FetchError::NotLoaded("content".into()))
    }

    fn scroll_simulate(&mut self, _steps: u32, _delay_ms: u64) -> Result<(), FetchError> {
        match self.current {
            Some(_) => Ok(()),
            None => Err(FetchError::NotLoaded("scroll".into())),
        }
    }

    fn interact(
        &mut self,
        anchor: &DomAnchor,
        action: InteractAction,
    ) -> Result<InteractOutcome, FetchError> {
        let key = anchor.selector();
        if self.broken.contains(key) {
            return Err(FetchError::SessionProtocol {
                command: action.as_str().into(),
                error: format!("element {key} detached"),
            });
        }

        let Some(html) = &self.current else {
            return Err(FetchError::NotLoaded(key.to_string()));
        };
        let found = selector(key).is_some_and(|sel| parse(html).select(&sel).next().is_some());
        if !found {
            return Ok(InteractOutcome::NotFound);
        }

        if action == InteractAction::Click {
            self.clicks.push(key.to_string());
            self.last_clicked = Some(key.to_string());
            if let Some(effects) = self.click_effects.get(key) {
                for (sel, text) in effects {
                    self.overrides.insert(sel.clone(), text.clone());
                }
            }
        }
        Ok(InteractOutcome::Performed)
    }

    fn await_update(&mut self, _region_selector: &str, _timeout: Duration) -> Result<bool, FetchError> {
        Ok(self
            .last_clicked
            .as_ref()
            .is_none_or(|anchor| !self.stalled.contains(anchor)))
    }

    fn query_text(&mut self, css: &str) -> Result<Option<String>, FetchError> {
        if let Some(text) = self.overrides.get(css) {
            return Ok(Some(text.clone()));
        }
        let Some(html) = &self.current else {
            return Err(FetchError::NotLoaded(css.to_string()));
        };
        let Some(sel) = selector(css) else {
            return Ok(None);
        };
        let document = parse(html);
        Ok(document
            .select(&sel)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| !text.is_empty()))
    }
}
