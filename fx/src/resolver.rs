//! The rate resolver: refresh with fallback, conversion and staleness.

use std::sync::Arc;

use chrono::Duration;
use tracing::{info, instrument, warn};
use xrate_common::{Clock, CurrencyCode, SystemClock, Timestamp};

use crate::config::ResolverConfig;
use crate::error::{RefreshError, RefreshResult};
use crate::provider::{HttpRateSource, RateSource};
use crate::store::{RateSnapshot, RateStore, SnapshotOrigin};
use crate::table::RateTable;

/// Which kind of snapshot the resolver is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverMode {
    /// No refresh has succeeded yet; serving the seed table.
    Fallback,
    /// Serving the result of the last successful refresh.
    Live,
}

/// Outcome of a refresh attempt, with the snapshot now being served.
#[derive(Debug, Clone)]
pub enum RateFetch {
    /// The refresh succeeded and this snapshot was installed.
    Fresh(Arc<RateSnapshot>),
    /// The refresh failed; the previous snapshot is still served.
    StaleFallback {
        snapshot: Arc<RateSnapshot>,
        reason: RefreshError,
    },
}

impl RateFetch {
    /// The snapshot being served after the attempt.
    pub fn snapshot(&self) -> &Arc<RateSnapshot> {
        match self {
            RateFetch::Fresh(snapshot) => snapshot,
            RateFetch::StaleFallback { snapshot, .. } => snapshot,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, RateFetch::Fresh(_))
    }

    /// Collapse into a plain result, dropping the fallback snapshot.
    pub fn into_result(self) -> RefreshResult<Arc<RateSnapshot>> {
        match self {
            RateFetch::Fresh(snapshot) => Ok(snapshot),
            RateFetch::StaleFallback { reason, .. } => Err(reason),
        }
    }
}

/// Best-effort exchange rate service.
///
/// Construct one per process and share it (`Arc<RateResolver>`). Reads
/// never fail and never wait on a refresh: unknown currencies convert at
/// 1.0 and a failed refresh leaves the previous snapshot in place.
pub struct RateResolver {
    source: Arc<dyn RateSource>,
    store: RateStore,
    config: ResolverConfig,
}

impl RateResolver {
    /// Create a resolver serving the embedded table until a refresh succeeds.
    pub fn new(source: Arc<dyn RateSource>, config: ResolverConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Like [`RateResolver::new`] with an explicit clock.
    ///
    /// The embedded table is rebased onto `config.base`.
    pub fn with_clock(
        source: Arc<dyn RateSource>,
        config: ResolverConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let table = RateTable::embedded_in(&config.base);
        Self::with_table(source, config, table, clock)
    }

    /// Create a resolver seeded with `table` instead of the embedded one.
    ///
    /// An explicitly seeded table's base overrides `config.base`.
    pub fn with_table(
        source: Arc<dyn RateSource>,
        mut config: ResolverConfig,
        table: RateTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        config.base = table.base().clone();
        Self {
            source,
            store: RateStore::new(table, SnapshotOrigin::Embedded, clock),
            config,
        }
    }

    /// Create a resolver backed by an HTTP source built from `config`.
    pub fn from_config(config: ResolverConfig) -> RefreshResult<Self> {
        let source = HttpRateSource::from_config(&config)?;
        Ok(Self::new(Arc::new(source), config))
    }

    /// Fetch, validate and install a new table.
    ///
    /// On failure the current snapshot is left untouched and returned as
    /// [`RateFetch::StaleFallback`] together with the reason.
    #[instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn refresh_or_fallback(&self) -> RateFetch {
        match self.fetch_table().await {
            Ok(table) => {
                let currencies = table.len();
                let snapshot = self.store.replace(
                    table,
                    SnapshotOrigin::Remote {
                        source: self.source.name().to_string(),
                    },
                );
                info!(currencies, "Rates refreshed");
                RateFetch::Fresh(snapshot)
            }
            Err(reason) => {
                let snapshot = self.store.get();
                warn!(
                    error = %reason,
                    error_code = reason.error_code(),
                    retryable = reason.is_retryable(),
                    serving_since = %snapshot.last_updated,
                    "Rate refresh failed, keeping previous rates"
                );
                RateFetch::StaleFallback { snapshot, reason }
            }
        }
    }

    /// Refresh the rate table from the remote source.
    pub async fn refresh(&self) -> RefreshResult<()> {
        self.refresh_or_fallback().await.into_result().map(|_| ())
    }

    async fn fetch_table(&self) -> RefreshResult<RateTable> {
        let timeout = self.config.request_timeout;
        let payload = tokio::time::timeout(timeout, self.source.fetch())
            .await
            .map_err(|_| RefreshError::Timeout(timeout))??;

        // Rates without a declared base are quoted in the configured base.
        let declared = payload
            .declared_base()?
            .unwrap_or_else(|| self.config.base.clone());

        RateTable::normalize(self.config.base.clone(), Some(&declared), payload.rates)
    }

    /// Convert `amount` from one currency to another.
    ///
    /// Returns `amount` unchanged when both codes are the same. Codes the
    /// current table does not know are treated as rate 1.0.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if same_code(from, to) {
            return amount;
        }
        let snapshot = self.store.get();
        amount / snapshot.rates.rate_or_identity(from) * snapshot.rates.rate_or_identity(to)
    }

    /// Convert `amount` into the base currency.
    pub fn convert_to_base(&self, amount: f64, from: &str) -> f64 {
        self.convert(amount, from, self.config.base.as_str())
    }

    /// Convert a base-currency `amount` into `to`.
    pub fn convert_from_base(&self, amount: f64, to: &str) -> f64 {
        self.convert(amount, self.config.base.as_str(), to)
    }

    /// Units of `to` per unit of `from`.
    pub fn exchange_rate(&self, from: &str, to: &str) -> f64 {
        if same_code(from, to) {
            return 1.0;
        }
        let snapshot = self.store.get();
        snapshot.rates.rate_or_identity(to) / snapshot.rates.rate_or_identity(from)
    }

    /// Units of the base currency per unit of `from`.
    pub fn exchange_rate_to_base(&self, from: &str) -> f64 {
        self.exchange_rate(from, self.config.base.as_str())
    }

    /// Whether the snapshot is older than the configured max age.
    pub fn is_stale(&self) -> bool {
        self.is_stale_after(self.config.max_age)
    }

    /// Whether the snapshot is older than `max_age`.
    pub fn is_stale_after(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    /// Time since the current snapshot was installed.
    pub fn age(&self) -> Duration {
        self.store.clock().now() - self.store.get().last_updated
    }

    /// The snapshot currently being served.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.store.get()
    }

    pub fn last_updated(&self) -> Timestamp {
        self.store.get().last_updated
    }

    pub fn mode(&self) -> ResolverMode {
        if self.store.get().is_live() {
            ResolverMode::Live
        } else {
            ResolverMode::Fallback
        }
    }

    /// Whether the current table has a rate for `code`.
    pub fn supports(&self, code: &str) -> bool {
        self.store.get().rates.contains(code)
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.config.base
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

impl std::fmt::Debug for RateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateResolver")
            .field("source", &self.source.name())
            .field("store", &self.store)
            .field("config", &self.config)
            .finish()
    }
}

fn same_code(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
