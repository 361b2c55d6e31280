//! xrate FX Resolver
//!
//! Best-effort exchange rates for display: always answers, prefers live
//! data, and survives total network failure by serving the last good table
//! (or the compiled-in one).
//!
//! # Features
//!
//! - Remote refresh with validation and rebasing onto the configured base
//! - Atomic whole-table snapshot replacement; reads never wait on refresh
//! - Permissive conversion (unknown codes convert at 1.0)
//! - Advisory staleness checks; refresh is always caller driven
//! - Per-currency display formatting with K/M/B abbreviation
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use xrate_fx::{AmountFormatter, RateResolver, ResolverConfig};
//!
//! let resolver = Arc::new(RateResolver::from_config(ResolverConfig::from_env())?);
//!
//! if resolver.is_stale() {
//!     let _ = resolver.refresh().await;
//! }
//!
//! let eur = resolver.convert(100.0, "USD", "EUR");
//! let label = AmountFormatter::new(resolver.clone()).format(1_500_000.0, "USD", "$");
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod provider;
pub mod resolver;
pub mod store;
pub mod table;

pub use config::ResolverConfig;
pub use error::{RefreshError, RefreshResult};
pub use format::{format_amount, scale_factor, AmountFormatter, ScaleClass};
pub use provider::{HttpRateSource, RatePayload, RateSource};
pub use resolver::{RateFetch, RateResolver, ResolverMode};
pub use store::{RateSnapshot, RateStore, SnapshotOrigin};
pub use table::RateTable;

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateSource;
