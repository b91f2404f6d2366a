use tracing::debug;
use url::Url;

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::PageFetcher;
use crate::detect::card_model::{CardCandidate, ProductCard};
use crate::extract::fallback::complete_with_fallback;
use crate::extract::fields::{extract_fields, ResolveConfig};

/// Turns classified candidates into complete product cards.
///
/// Extraction runs over the whole page first, so the parsed document can be
/// dropped before any detail page is fetched for fallback.
pub struct FieldResolver<'a> {
    pub page_url: &'a Url,
    pub config: &'a ResolveConfig,
    pub fetch: &'a FetchConfig,
}

impl<'a> FieldResolver<'a> {
    pub fn new(page_url: &'a Url, config: &'a ResolveConfig, fetch: &'a FetchConfig) -> Self {
        Self {
            page_url,
            config,
            fetch,
        }
    }

    pub fn resolve(&self, candidate: &CardCandidate<'_>) -> ProductCard {
        extract_fields(candidate, self.page_url, self.config)
    }

    pub fn resolve_all(&self, candidates: &[CardCandidate<'_>]) -> Vec<ProductCard> {
        candidates.iter().map(|c| self.resolve(c)).collect()
    }

    /// Run the detail page fallback over every incomplete card, in order.
    pub fn complete<F>(&self, cards: Vec<ProductCard>, fetcher: &mut F) -> Vec<ProductCard>
    where
        F: PageFetcher + ?Sized,
    {
        let incomplete = cards.iter().filter(|c| c.needs_fallback).count();
        if incomplete > 0 {
            debug!(incomplete, total = cards.len(), "completing cards from detail pages");
        }

        cards
            .into_iter()
            .map(|card| complete_with_fallback(card, fetcher, self.fetch, self.config, self.page_url))
            .collect()
    }
}
