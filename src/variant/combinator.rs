use std::thread;
use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::{InteractAction, InteractOutcome, PageFetcher};
use crate::detect::patterns::find_price;
use crate::extract::fallback::PRICE_ANCHORS;
use crate::variant::discovery::discover_dimensions;
use crate::variant::variant_model::{Assignment, VariantCombination, VariantConfig, VariantDimension};

// ============================================================================
// Cartesian product
// ============================================================================

/// Every combination of one option per dimension, as option indices.
///
/// Dimension order is kept and the last dimension varies fastest, so options
/// appear in DOM order within each position. The length is always the
/// product of the option counts.
pub fn cartesian_product(dimensions: &[VariantDimension]) -> Vec<Vec<usize>> {
    if dimensions.is_empty() {
        return Vec::new();
    }

    let mut combos: Vec<Vec<usize>> = vec![Vec::new()];
    for dim in dimensions {
        combos = combos
            .into_iter()
            .flat_map(|prefix| {
                (0..dim.options.len()).map(move |i| {
                    let mut next = prefix.clone();
                    next.push(i);
                    next
                })
            })
            .collect();
    }
    combos
}

pub fn assignment_for(dimensions: &[VariantDimension], combo: &[usize]) -> Assignment {
    Assignment(
        dimensions
            .iter()
            .zip(combo)
            .map(|(dim, &i)| (dim.label.clone(), dim.options[i].value.clone()))
            .collect(),
    )
}

// ============================================================================
// Enumeration state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationState {
    Idle,
    SelectDimension(usize),
    AwaitUpdate(usize),
    CapturePrice(usize),
    NextCombination,
    Done,
}

/// Drives the page through every combination, one selection at a time.
///
/// `AwaitUpdate` is the only state that waits on the page and it is bounded
/// by `await_timeout_ms`; a timeout moves on to `CapturePrice` with a null
/// price. A failed interaction records the combination without a price. No
/// single combination can stop the enumeration.
pub struct VariantDriver<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a mut F,
    config: &'a VariantConfig,
    dimensions: &'a [VariantDimension],
    combos: Vec<Vec<usize>>,
    index: usize,
    /// Selection currently applied on the page, if known.
    applied: Option<Vec<usize>>,
    price: Option<String>,
    timed_out: bool,
    failed: bool,
    state: EnumerationState,
    results: Vec<VariantCombination>,
}

impl<'a, F: PageFetcher + ?Sized> VariantDriver<'a, F> {
    pub fn new(fetcher: &'a mut F, dimensions: &'a [VariantDimension], config: &'a VariantConfig) -> Self {
        Self {
            fetcher,
            config,
            dimensions,
            combos: cartesian_product(dimensions),
            index: 0,
            applied: None,
            price: None,
            timed_out: false,
            failed: false,
            state: EnumerationState::Idle,
            results: Vec::new(),
        }
    }

    pub fn state(&self) -> EnumerationState {
        self.state
    }

    pub fn combination_count(&self) -> usize {
        self.combos.len()
    }

    /// Advance one transition and return the new state.
    pub fn step(&mut self) -> EnumerationState {
        self.state = match self.state {
            EnumerationState::Idle => {
                if self.combos.is_empty() {
                    EnumerationState::Done
                } else {
                    EnumerationState::SelectDimension(0)
                }
            }
            EnumerationState::SelectDimension(i) => self.select(i),
            EnumerationState::AwaitUpdate(i) => self.await_update(i),
            EnumerationState::CapturePrice(i) => self.capture(i),
            EnumerationState::NextCombination => self.next_combination(),
            EnumerationState::Done => EnumerationState::Done,
        };
        self.state
    }

    /// Run to `Done` and hand back one entry per combination.
    pub fn run(mut self) -> Vec<VariantCombination> {
        while self.step() != EnumerationState::Done {}
        self.results
    }

    fn combo(&self) -> &[usize] {
        &self.combos[self.index]
    }

    /// The page already shows this option when every selection up to and
    /// including dimension `i` is unchanged from the applied combination.
    fn already_selected(&self, i: usize) -> bool {
        self.applied
            .as_ref()
            .is_some_and(|applied| applied[..=i] == self.combo()[..=i])
    }

    fn select(&mut self, i: usize) -> EnumerationState {
        if self.already_selected(i) {
            return EnumerationState::CapturePrice(i);
        }

        let dimensions = self.dimensions;
        let option = &dimensions[i].options[self.combo()[i]];
        let pause = self.config.option_delay.sample_ms();
        if pause > 0 {
            thread::sleep(Duration::from_millis(pause));
        }

        match self.fetcher.interact(&option.anchor, InteractAction::Click) {
            Ok(InteractOutcome::Performed) => EnumerationState::AwaitUpdate(i),
            Ok(InteractOutcome::NotFound) => {
                debug!(anchor = %option.anchor, "variant option no longer on page");
                self.failed = true;
                EnumerationState::NextCombination
            }
            Err(e) => {
                debug!(anchor = %option.anchor, error = %e, "variant option click failed");
                self.failed = true;
                EnumerationState::NextCombination
            }
        }
    }

    fn await_update(&mut self, i: usize) -> EnumerationState {
        let timeout = Duration::from_millis(self.config.await_timeout_ms);
        self.timed_out = match self.fetcher.await_update(&self.config.price_region, timeout) {
            Ok(settled) => !settled,
            Err(e) => {
                debug!(error = %e, "waiting for price update failed");
                true
            }
        };
        EnumerationState::CapturePrice(i)
    }

    fn capture(&mut self, i: usize) -> EnumerationState {
        self.price = if self.timed_out {
            None
        } else {
            self.read_price(i)
        };
        self.timed_out = false;

        if i + 1 < self.dimensions.len() {
            EnumerationState::SelectDimension(i + 1)
        } else {
            EnumerationState::NextCombination
        }
    }

    /// Price region first, then whatever price the selected option shows.
    fn read_price(&mut self, i: usize) -> Option<String> {
        for anchor in PRICE_ANCHORS {
            if let Ok(Some(text)) = self.fetcher.query_text(anchor) {
                if let Some(price) = find_price(&text) {
                    return Some(price);
                }
            }
        }

        let anchor = self.dimensions[i].options[self.combo()[i]].anchor.clone();
        match self.fetcher.query_text(anchor.selector()) {
            Ok(Some(text)) => find_price(&text),
            _ => None,
        }
    }

    fn next_combination(&mut self) -> EnumerationState {
        let combo = self.combo().to_vec();
        let price = if self.failed { None } else { self.price.take() };

        self.results.push(VariantCombination {
            assignment: assignment_for(self.dimensions, &combo),
            price,
        });

        // After a failed selection the page state is unknown; reselect everything.
        self.applied = if self.failed { None } else { Some(combo) };
        self.failed = false;
        self.price = None;
        self.index += 1;

        if self.index < self.combos.len() {
            EnumerationState::SelectDimension(0)
        } else {
            EnumerationState::Done
        }
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Open a product detail page, discover its variant dimensions and price
/// every combination.
///
/// An empty result means either no variants or an unreachable page; both are
/// valid outcomes and neither is an error.
pub fn extract_variants<F>(
    fetcher: &mut F,
    product_url: &str,
    fetch: &FetchConfig,
    config: &VariantConfig,
) -> Vec<VariantCombination>
where
    F: PageFetcher + ?Sized,
{
    let attempts = config.attempts.max(1);
    let mut html = None;

    for attempt in 1..=attempts {
        match fetcher.navigate(product_url, &fetch.randomized()) {
            Ok(page) => {
                html = Some(page);
                break;
            }
            Err(e) => warn!(url = product_url, attempt, error = %e, "detail page fetch failed"),
        }
    }

    let Some(html) = html else {
        warn!(url = product_url, attempts, "giving up on variants");
        return Vec::new();
    };

    let dimensions = {
        let document = Html::parse_document(&html);
        discover_dimensions(&document, &config.dimension_labels)
    };

    if dimensions.is_empty() {
        debug!(url = product_url, "no variant dimensions found");
        return Vec::new();
    }

    let driver = VariantDriver::new(fetcher, &dimensions, config);
    info!(
        url = product_url,
        dimensions = dimensions.len(),
        combinations = driver.combination_count(),
        "enumerating variants"
    );
    driver.run()
}
