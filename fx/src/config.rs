//! Resolver configuration.

use std::time::Duration;

use xrate_common::{constants, CurrencyCode};

/// Default public endpoint. Returns `{"base_code": "USD", "rates": {...}}`.
pub const DEFAULT_ENDPOINT: &str = "https://open.er-api.com/v6/latest/USD";

/// Configuration for [`crate::RateResolver`] and its HTTP source.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Rate source URL.
    pub endpoint: String,
    /// Base currency all rates are stored against.
    pub base: CurrencyCode,
    /// Upper bound on one refresh, network included.
    pub request_timeout: Duration,
    /// Default staleness threshold.
    pub max_age: chrono::Duration,
    /// Name recorded on snapshots from this source.
    pub source_name: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            base: CurrencyCode::usd(),
            request_timeout: constants::default_request_timeout(),
            max_age: constants::default_max_age(),
            source_name: "open.er-api.com".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("XRATE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(base) = std::env::var("XRATE_BASE") {
            if let Ok(base) = base.parse() {
                config.base = base;
            }
        }

        if let Ok(secs) = std::env::var("XRATE_TIMEOUT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.request_timeout = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("XRATE_MAX_AGE_SECS") {
            if let Some(max_age) = secs.parse().ok().and_then(max_age_from_secs) {
                config.max_age = max_age;
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Rate endpoint cannot be empty".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("Request timeout cannot be 0".to_string());
        }

        if self.max_age <= chrono::Duration::zero() {
            return Err("Max age must be positive".to_string());
        }

        Ok(())
    }
}

/// Seconds to a max age, or `None` if the value overflows a duration.
pub fn max_age_from_secs(secs: i64) -> Option<chrono::Duration> {
    chrono::Duration::try_seconds(secs)
}
