use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::MetadataError;

/// Symbols subscribed when a feed file does not list any
pub const DEFAULT_SYMBOLS: [&str; 7] = ["AAPL", "AMZN", "MSFT", "GOOGL", "TSLA", "NVDA", "META"];

/// Where the feed access token comes from unless the feed file says otherwise
pub const DEFAULT_TOKEN_SOURCE: &str = "env:FINNHUB_API_KEY";

/// Default read timeout before an idle socket is treated as dead
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 120;

/// Reconnect backoff applied between feed connection attempts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconnectSettings {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Fraction of the delay randomised in either direction (0.1 = ±10%)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> f64 {
    0.1
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
        }
    }
}

impl ReconnectSettings {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Upstream feed definition: where to connect and what to subscribe to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub name: String,
    /// Websocket endpoint without the access token (e.g. wss://ws.finnhub.io)
    pub endpoint: String,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    /// Key source for the access token, e.g. "env:FINNHUB_API_KEY"
    #[serde(default = "default_token_source")]
    pub token_source: String,
    #[serde(default)]
    pub reconnect: ReconnectSettings,
    /// Seconds without any inbound frame before the connection is recycled (0 = never)
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Maximum symbols handled by one session (0 = a single session for all symbols)
    #[serde(default)]
    pub symbols_per_session: usize,
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_token_source() -> String {
    DEFAULT_TOKEN_SOURCE.to_string()
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

impl Feed {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a feed definition from YAML text
    pub fn parse(content: &str) -> Result<Self, MetadataError> {
        let feed: Feed = serde_yaml::from_str(content)?;
        feed.validate()?;
        Ok(feed)
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.endpoint.trim().is_empty() {
            return Err(MetadataError::Validation(format!(
                "feed {}: endpoint must not be empty",
                self.name
            )));
        }
        if self.symbols.is_empty() {
            return Err(MetadataError::Validation(format!(
                "feed {}: at least one symbol is required",
                self.name
            )));
        }
        if let Some(blank) = self.symbols.iter().position(|s| s.trim().is_empty()) {
            return Err(MetadataError::Validation(format!(
                "feed {}: symbol #{} is blank",
                self.name, blank
            )));
        }
        if self.reconnect.multiplier < 1.0 {
            return Err(MetadataError::Validation(format!(
                "feed {}: reconnect multiplier must be >= 1.0, got {}",
                self.name, self.reconnect.multiplier
            )));
        }
        if !(0.0..1.0).contains(&self.reconnect.jitter) {
            return Err(MetadataError::Validation(format!(
                "feed {}: reconnect jitter must be in [0, 1), got {}",
                self.name, self.reconnect.jitter
            )));
        }
        Ok(())
    }

    /// Read timeout as a duration, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_secs > 0).then(|| Duration::from_secs(self.read_timeout_secs))
    }
}
