use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use tracing::debug;

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::{InteractAction, InteractOutcome, PageFetcher};
use crate::dom::anchor::DomAnchor;
use crate::dom::tree::{element_text, parse, selector};
use crate::error::FetchError;

/// Plain HTTP fetcher for pages that render server-side.
///
/// No script runs, so there is nothing to scroll and nothing to click:
/// interactions report `Unsupported` and variant enumeration degrades to
/// null prices.
pub struct HttpFetcher {
    client: Client,
    last: Option<(String, String)>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .build()
            .map_err(|e| FetchError::Http {
                url: "<client>".into(),
                source: e,
            })?;
        Ok(Self { client, last: None })
    }
}

impl PageFetcher for HttpFetcher {
    fn navigate(&mut self, url: &str, config: &FetchConfig) -> Result<String, FetchError> {
        let timeout = Duration::from_millis(config.navigation_timeout_ms);
        let mut request = self
            .client
            .get(url)
            .timeout(timeout)
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, config.accept_language());
        if let Some(agent) = &config.user_agent {
            request = request.header(USER_AGENT, agent.as_str());
        }

        let response = request.send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    context: format!("GET {url}"),
                    timeout_ms: config.navigation_timeout_ms,
                }
            } else {
                FetchError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;
        debug!(url, bytes = body.len(), "fetched page over HTTP");

        self.last = Some((url.to_string(), body.clone()));
        Ok(body)
    }

    fn content(&mut self) -> Result<String, FetchError> {
        self.last
            .as_ref()
            .map(|(_, html)| html.clone())
            .ok_or_else(|| FetchError::NotLoaded("content".into()))
    }

    fn scroll_simulate(&mut self, _steps: u32, _delay_ms: u64) -> Result<(), FetchError> {
        Ok(())
    }

    fn interact(
        &mut self,
        _anchor: &DomAnchor,
        _action: InteractAction,
    ) -> Result<InteractOutcome, FetchError> {
        Err(FetchError::Unsupported {
            fetcher: "HttpFetcher",
            operation: "interaction",
        })
    }

    fn await_update(&mut self, _region_selector: &str, _timeout: Duration) -> Result<bool, FetchError> {
        Err(FetchError::Unsupported {
            fetcher: "HttpFetcher",
            operation: "await_update",
        })
    }

    fn query_text(&mut self, css: &str) -> Result<Option<String>, FetchError> {
        let (_, html) = self
            .last
            .as_ref()
            .ok_or_else(|| FetchError::NotLoaded(css.to_string()))?;
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
