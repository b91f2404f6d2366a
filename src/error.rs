use thiserror::Error;

/// Failures reported by a page fetcher.
///
/// None of these abort a harvest on their own: the caller degrades the
/// affected pass, field or variant combination and carries on.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Browser server subprocess failed to spawn
    #[error("failed to spawn {script} (is Node.js installed?): {source}")]
    SubprocessSpawn {
        script: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the browser server failed
    #[error("browser session I/O: {0}")]
    SessionIO(String),

    /// Browser server answered with `ok: false` or an unexpected shape
    #[error("browser command '{command}' failed: {error}")]
    SessionProtocol { command: String, error: String },

    #[error("HTTP request for {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("timed out after {timeout_ms}ms: {context}")]
    Timeout { context: String, timeout_ms: u64 },

    /// The fetcher cannot perform this kind of interaction at all
    #[error("{fetcher} does not support {operation}")]
    Unsupported {
        fetcher: &'static str,
        operation: &'static str,
    },

    #[error("no page loaded for {0}")]
    NotLoaded(String),

    #[error("JSON parse error ({context}): {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialize error ({context}): {source}")]
    JsonSerialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by the harvest pipeline and its outer layers.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Every pass failed to obtain page content; the only fatal pipeline error
    #[error("no page content obtained from {url} in any of {passes} passes")]
    NoPageContent { url: String, passes: usize },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {path}: {source}")]
    Input {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error ({context}): {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}
