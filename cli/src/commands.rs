//! Command implementations. Each takes the shared resolver explicitly.

use std::fmt::Write;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use xrate_fx::{AmountFormatter, RateFetch, RateResolver, ResolverMode, SnapshotOrigin};

use crate::metrics::RefreshStats;

/// Refresh once unless running offline. Failures are reported, not raised.
pub async fn prime(resolver: &RateResolver, offline: bool) -> Option<RateFetch> {
    if offline {
        debug!("Offline, serving embedded rates");
        return None;
    }
    Some(resolver.refresh_or_fallback().await)
}

/// One-line description of the snapshot being served.
pub fn status_line(resolver: &RateResolver) -> String {
    let snapshot = resolver.snapshot();
    let origin = match &snapshot.origin {
        SnapshotOrigin::Embedded => "embedded fallback".to_string(),
        SnapshotOrigin::Remote { source } => format!("live from {}", source),
    };
    let stale = if resolver.is_stale() { ", stale" } else { "" };

    format!(
        "{} rates, base {}, updated {} ({}s ago{})",
        origin,
        resolver.base(),
        snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
        resolver.age().num_seconds(),
        stale
    )
}

pub fn rates(resolver: &RateResolver) -> String {
    let snapshot = resolver.snapshot();
    let mut out = status_line(resolver);
    out.push('\n');
    for (code, rate) in snapshot.rates.iter() {
        let _ = writeln!(out, "{:<6}{:>16.6}", code, rate);
    }
    out
}

pub fn convert(resolver: &RateResolver, amount: f64, from: &str, to: &str) -> String {
    let converted = resolver.convert(amount, from, to);
    let mut out = format!(
        "{} {} = {} {}",
        amount,
        from.to_ascii_uppercase(),
        converted,
        to.to_ascii_uppercase()
    );
    append_unknown(&mut out, resolver, &[from, to]);
    out
}

pub fn rate(resolver: &RateResolver, from: &str, to: &str) -> String {
    let mut out = format!(
        "1 {} = {} {}",
        from.to_ascii_uppercase(),
        resolver.exchange_rate(from, to),
        to.to_ascii_uppercase()
    );
    append_unknown(&mut out, resolver, &[from, to]);
    out
}

pub fn format(formatter: &AmountFormatter, amount: f64, code: &str, symbol: Option<&str>) -> String {
    match symbol {
        Some(symbol) => formatter.format(amount, code, symbol),
        None => formatter.format_default(amount, code),
    }
}

/// Periodically refresh whenever the snapshot is stale or still the
/// fallback. Stops after `iterations` checks, or on Ctrl+C.
pub async fn watch(
    resolver: &RateResolver,
    interval: Duration,
    iterations: Option<u64>,
) -> RefreshStats {
    let mut stats = RefreshStats::new();
    let mut ticker = tokio::time::interval(interval);
    let mut checks = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }

        if resolver.mode() == ResolverMode::Fallback || resolver.is_stale() {
            let started = Instant::now();
            let fetch = resolver.refresh_or_fallback().await;
            let latency_ms = started.elapsed().as_millis() as u64;
            match fetch {
                RateFetch::Fresh(_) => stats.record_success(latency_ms),
                RateFetch::StaleFallback { reason, .. } => {
                    stats.record_failure(latency_ms, reason.error_code())
                }
            }
            info!(status = %status_line(resolver), "Checked rates");
        } else {
            stats.record_skip();
        }

        checks += 1;
        if iterations.is_some_and(|n| checks >= n) {
            break;
        }
    }

    stats
}

fn append_unknown(out: &mut String, resolver: &RateResolver, codes: &[&str]) {
    for code in codes {
        if !resolver.supports(code) {
            let _ = write!(
                out,
                "\nnote: {} is not in the rate table, converted at 1.0",
                code.to_ascii_uppercase()
            );
        }
    }
}
