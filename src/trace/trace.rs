use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Pipeline stage a trace event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestStage {
    RunStart,
    Navigate,
    Detect,
    Resolve,
    Fallback,
    PassComplete,
    PassFailed,
    Aggregate,
    Variants,
    RunComplete,
}

/// One line of the JSONL run trace.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestEvent {
    pub timestamp_ms: u128,
    pub stage: HarvestStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Fingerprints of the dominant layout patterns seen in a pass.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HarvestEvent {
    pub fn now(stage: HarvestStage) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            stage,
            pass: None,
            url: None,
            count: None,
            patterns: vec![],
            detail: None,
        }
    }

    pub fn with_pass(mut self, pass: usize) -> Self {
        self.pass = Some(pass);
        self
    }

    pub fn with_url(mut self, url: impl ToString) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<String>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
