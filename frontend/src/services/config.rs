use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STALE_SECS: u64 = 30;

/// Where the back-office API lives and how long fetched data stays fresh
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_prefix: String,
    pub timeout: Duration,
    pub stale_time: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            stale_time: Duration::from_secs(DEFAULT_STALE_SECS),
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at a custom base URL
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base url '{}'", base_url))?;
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Read `COOP_API_URL`, `COOP_API_PREFIX`, `COOP_API_TIMEOUT_SECS` and
    /// `COOP_CACHE_STALE_SECS`, falling back to defaults for unset keys
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match lookup("COOP_API_URL") {
            Some(url) => Self::with_base_url(&url)?,
            None => Self::default(),
        };
        if let Some(prefix) = lookup("COOP_API_PREFIX") {
            config.api_prefix = normalize_prefix(&prefix);
        }
        if let Some(secs) = lookup("COOP_API_TIMEOUT_SECS") {
            config.timeout = parse_secs("COOP_API_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("COOP_CACHE_STALE_SECS") {
            config.stale_time = parse_secs("COOP_CACHE_STALE_SECS", &secs)?;
        }
        Ok(config)
    }

    /// Absolute URL for an API path such as `bank/search`
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.api_prefix.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        self.base_url
            .join(&joined)
            .with_context(|| format!("cannot build endpoint for '{}'", path))
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{} must be a whole number of seconds, got '{}'", key, value))?;
    Ok(Duration::from_secs(secs))
}
