use serde::{Deserialize, Serialize};

// ============================================================================
// Browser profile handed to the page fetcher on every navigation
// ============================================================================

/// Which pool of user agents a navigation draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserAgentFamily {
    Any,
    Desktop,
    Mobile,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Options the fetcher uses to render a realistic page. Their effect is
/// opaque to detection; it only relies on getting a rendered page back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent_family: UserAgentFamily,
    /// Concrete user agent for this navigation; chosen by `randomized()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub viewport: Viewport,
    pub locale: String,
    pub timezone: String,
    pub geolocation: Option<Geolocation>,
    pub suppress_automation: bool,
    pub navigation_timeout_ms: u64,
    pub scroll_steps: u32,
    pub scroll_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent_family: UserAgentFamily::Desktop,
            user_agent: None,
            viewport: Viewport {
                width: 1280,
                height: 800,
            },
            locale: "en-US".to_string(),
            timezone: "America/New_York".to_string(),
            geolocation: Some(Geolocation {
                latitude: 40.7128,
                longitude: -74.0060,
            }),
            suppress_automation: true,
            navigation_timeout_ms: 60_000,
            scroll_steps: 15,
            scroll_delay_ms: 1_000,
        }
    }
}

impl FetchConfig {
    /// Copy of this profile with a user agent drawn from its family.
    pub fn randomized(&self) -> FetchConfig {
        let pool = user_agents(self.user_agent_family);
        let mut config = self.clone();
        config.user_agent = Some(pool[fastrand::usize(..pool.len())].to_string());
        config
    }

    /// `Accept-Language` header value derived from the locale.
    pub fn accept_language(&self) -> String {
        let primary = self.locale.split(['-', '_']).next().unwrap_or("en");
        format!("{},{};q=0.9", self.locale, primary)
    }
}

// ============================================================================
// User agent pools
// ============================================================================

const DESKTOP_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_0) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14.4; rv:109.0) Gecko/20100101 Firefox/115.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/115.0",
];

const MOBILE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14; SM-S901U) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.210 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 13; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.6099.210 Mobile Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 17_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1",
];

pub fn user_agents(family: UserAgentFamily) -> Vec<&'static str> {
    match family {
        UserAgentFamily::Desktop => DESKTOP_AGENTS.to_vec(),
        UserAgentFamily::Mobile => MOBILE_AGENTS.to_vec(),
        UserAgentFamily::Any => DESKTOP_AGENTS.iter().chain(MOBILE_AGENTS).copied().collect(),
    }
}
