//! Remote rate sources.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use xrate_common::CurrencyCode;

use crate::config::ResolverConfig;
use crate::error::{RefreshError, RefreshResult};

/// Raw rate table as returned by a remote source, before validation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RatePayload {
    /// Base the source claims its rates are quoted in, if it says.
    #[serde(default)]
    pub base: Option<String>,
    /// Same as `base`, under the name some feeds use.
    #[serde(default)]
    pub base_code: Option<String>,
    /// Currency code to rate.
    pub rates: BTreeMap<String, f64>,
}

impl RatePayload {
    /// Build a payload from literal pairs.
    pub fn new<I, S>(base: Option<&str>, rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            base: base.map(str::to_string),
            base_code: None,
            rates: rates.into_iter().map(|(code, rate)| (code.into(), rate)).collect(),
        }
    }

    /// The declared base, from `base` or `base_code`.
    ///
    /// Both may be present but must then name the same currency.
    pub fn declared_base(&self) -> RefreshResult<Option<CurrencyCode>> {
        let parse = |raw: &Option<String>| -> RefreshResult<Option<CurrencyCode>> {
            raw.as_deref()
                .map(|code| {
                    CurrencyCode::parse(code).map_err(|e| RefreshError::Malformed(e.to_string()))
                })
                .transpose()
        };

        match (parse(&self.base)?, parse(&self.base_code)?) {
            (Some(base), Some(base_code)) if base != base_code => Err(RefreshError::Malformed(
                format!("base {} disagrees with base_code {}", base, base_code),
            )),
            (base, base_code) => Ok(base.or(base_code)),
        }
    }
}

/// A source of live exchange rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Source name, recorded on snapshots and in logs.
    fn name(&self) -> &str;

    /// Fetch the current rate table.
    async fn fetch(&self) -> RefreshResult<RatePayload>;
}

/// Fetches a JSON rate table with an unauthenticated HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    name: String,
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpRateSource {
    /// Create a source for `endpoint`; each request is bounded by `timeout`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RefreshResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("xrate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        Ok(Self {
            name: "http".to_string(),
            endpoint: endpoint.into(),
            timeout,
            client,
        })
    }

    /// Create a source from resolver configuration.
    pub fn from_config(config: &ResolverConfig) -> RefreshResult<Self> {
        Ok(Self::new(config.endpoint.clone(), config.request_timeout)?
            .with_name(config.source_name.clone()))
    }

    /// Override the source name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> RefreshError {
        if err.is_timeout() {
            RefreshError::Timeout(self.timeout)
        } else {
            err.into()
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> RefreshResult<RatePayload> {
        debug!(endpoint = %self.endpoint, "Fetching rates");

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| self.classify(e))?;
        serde_json::from_str(&body).map_err(|e| RefreshError::Malformed(e.to_string()))
    }
}

/// Programmable rate source for tests.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    name: String,
    response: parking_lot::Mutex<RefreshResult<RatePayload>>,
    delay: parking_lot::Mutex<Option<Duration>>,
    fetches: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// Create a mock that fails with a transport error until programmed.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response: parking_lot::Mutex::new(Err(RefreshError::Transport(
                "no response programmed".to_string(),
            ))),
            delay: parking_lot::Mutex::new(None),
            fetches: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Answer subsequent fetches with `payload`.
    pub fn respond_with(&self, payload: RatePayload) {
        *self.response.lock() = Ok(payload);
    }

    /// Fail subsequent fetches with `err`.
    pub fn fail_with(&self, err: RefreshError) {
        *self.response.lock() = Err(err);
    }

    /// Sleep this long before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Number of fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> RefreshResult<RatePayload> {
        self.fetches
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.response.lock().clone()
    }
}
