use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::fetch_config::FetchConfig;
use crate::browser::fetcher::{InteractAction, InteractOutcome, PageFetcher};
use crate::dom::anchor::DomAnchor;
use crate::error::FetchError;

/// Request sent to the browser server over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
        config: FetchConfig,
        timeout_ms: u64,
    },
    Content {
        cmd: &'static str,
    },
    Scroll {
        cmd: &'static str,
        steps: u32,
        delay_ms: u64,
    },
    Action {
        cmd: &'static str,
        action: &'static str,
        selector: String,
    },
    AwaitUpdate {
        cmd: &'static str,
        selector: String,
        timeout_ms: u64,
    },
    QueryText {
        cmd: &'static str,
        selector: String,
    },
    Quit {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str, config: &FetchConfig) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
            config: config.clone(),
            timeout_ms: config.navigation_timeout_ms,
        }
    }

    pub fn content() -> Self {
        BrowserRequest::Content { cmd: "content" }
    }

    pub fn scroll(steps: u32, delay_ms: u64) -> Self {
        BrowserRequest::Scroll {
            cmd: "scroll",
            steps,
            delay_ms,
        }
    }

    pub fn action(anchor: &DomAnchor, action: InteractAction) -> Self {
        BrowserRequest::Action {
            cmd: "action",
            action: action.as_str(),
            selector: anchor.selector().to_string(),
        }
    }

    pub fn await_update(selector: &str, timeout: Duration) -> Self {
        BrowserRequest::AwaitUpdate {
            cmd: "await_update",
            selector: selector.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn query_text(selector: &str) -> Self {
        BrowserRequest::QueryText {
            cmd: "query_text",
            selector: selector.to_string(),
        }
    }

    pub fn quit() -> Self {
        BrowserRequest::Quit { cmd: "quit" }
    }
}

/// Response received from the browser server over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub found: Option<bool>,
    #[serde(default)]
    pub updated: Option<bool>,
    #[serde(default)]
    pub timed_out: Option<bool>,
}

/// A persistent browser session backed by an external browser server.
///
/// Launches a long-lived Node.js process that keeps one Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout. The
/// server applies the `FetchConfig` profile (user agent, viewport, locale,
/// timezone, geolocation, automation-signal suppression) on navigation.
pub struct BrowserSession {
    child: Child,
    stdin: std::process::ChildStdin,
    reader: BufReader<std::process::ChildStdout>,
    current_url: Option<String>,
}

impl BrowserSession {
    /// Launch a new browser session by spawning the server script.
    pub fn launch(script: &str) -> Result<Self, FetchError> {
        let mut child = Command::new("node")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| FetchError::SubprocessSpawn {
                script: script.into(),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FetchError::SessionIO("failed to capture stdin of browser server".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| FetchError::SessionIO("failed to capture stdout of browser server".into()))?;

        let mut reader = BufReader::new(stdout);

        // Wait for the ready signal
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| FetchError::SessionIO(format!("failed to read ready signal: {}", e)))?;

        let response: BrowserResponse =
            serde_json::from_str(line.trim()).map_err(|e| FetchError::JsonParse {
                context: "browser server ready signal".into(),
                source: e,
            })?;

        if !response.ok || response.ready != Some(true) {
            return Err(FetchError::SessionProtocol {
                command: "launch".into(),
                error: "did not receive ready signal from browser server".into(),
            });
        }

        debug!(script, "browser session ready");

        Ok(BrowserSession {
            child,
            stdin,
            reader,
            current_url: None,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, FetchError> {
        let json = serde_json::to_string(request).map_err(|e| FetchError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            FetchError::SessionIO(format!("failed to write to browser server stdin: {}", e))
        })?;

        self.stdin
            .flush()
            .map_err(|e| FetchError::SessionIO(format!("failed to flush browser server stdin: {}", e)))?;

        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            FetchError::SessionIO(format!("failed to read from browser server stdout: {}", e))
        })?;

        if line.trim().is_empty() {
            return Err(FetchError::SessionIO(
                "empty response from browser server (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| FetchError::JsonParse {
            context: "browser server response".into(),
            source: e,
        })
    }

    /// Send a request and verify it succeeded.
    fn send_ok(
        &mut self,
        request: &BrowserRequest,
        command_name: &str,
    ) -> Result<BrowserResponse, FetchError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(FetchError::SessionProtocol {
                command: command_name.into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }

    fn html_from(response: BrowserResponse, command_name: &str) -> Result<String, FetchError> {
        response.html.ok_or_else(|| FetchError::SessionProtocol {
            command: command_name.into(),
            error: "no html in response".into(),
        })
    }

    /// Get the last navigated URL (cached, no browser call).
    pub fn last_url(&self) -> Option<&str> {
        self.current_url.as_deref()
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), FetchError> {
        let request = BrowserRequest::quit();
        // Best-effort quit, the process may already be gone
        let _ = self.send(&request);
        let _ = self.child.wait();
        Ok(())
    }
}

impl PageFetcher for BrowserSession {
    fn navigate(&mut self, url: &str, config: &FetchConfig) -> Result<String, FetchError> {
        let request = BrowserRequest::navigate(url, config);
        let response = self.send(&request)?;
        if response.timed_out == Some(true) {
            return Err(FetchError::Timeout {
                context: format!("navigate {url}"),
                timeout_ms: config.navigation_timeout_ms,
            });
        }
        if !response.ok {
            return Err(FetchError::SessionProtocol {
                command: "navigate".into(),
                error: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        self.current_url = Some(url.to_string());
        Self::html_from(response, "navigate")
    }

    fn content(&mut self) -> Result<String, FetchError> {
        let response = self.send_ok(&BrowserRequest::content(), "content")?;
        Self::html_from(response, "content")
    }

    fn scroll_simulate(&mut self, steps: u32, delay_ms: u64) -> Result<(), FetchError> {
        self.send_ok(&BrowserRequest::scroll(steps, delay_ms), "scroll")?;
        Ok(())
    }

    fn interact(
        &mut self,
        anchor: &DomAnchor,
        action: InteractAction,
    ) -> Result<InteractOutcome, FetchError> {
        let response = self.send_ok(&BrowserRequest::action(anchor, action), action.as_str())?;
        Ok(match response.found {
            Some(false) => InteractOutcome::NotFound,
            _ => InteractOutcome::Performed,
        })
    }

    fn await_update(&mut self, region_selector: &str, timeout: Duration) -> Result<bool, FetchError> {
        let response = self.send_ok(
            &BrowserRequest::await_update(region_selector, timeout),
            "await_update",
        )?;
        Ok(response.updated.unwrap_or(false))
    }

    fn query_text(&mut self, selector: &str) -> Result<Option<String>, FetchError> {
        let response = self.send_ok(&BrowserRequest::query_text(selector), "query_text")?;
        Ok(response.text)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        if let Err(e) = self.quit() {
            warn!(error = %e, "browser session did not shut down cleanly");
        }
    }
}
