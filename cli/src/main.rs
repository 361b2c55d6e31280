//! xrate CLI
//!
//! Inspect, convert and format with the exchange rate resolver. One
//! resolver is built at start-up and handed to whichever command runs.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn, Subscriber};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use xrate_fx::config::max_age_from_secs;
use xrate_fx::{AmountFormatter, RateFetch, RateResolver, ResolverConfig};

mod commands;
mod metrics;

/// xrate command-line interface
#[derive(Parser, Debug)]
#[command(name = "xrate")]
#[command(about = "Best-effort exchange rates with offline fallback")]
struct Args {
    /// Rate source URL (overrides XRATE_ENDPOINT)
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Base currency (overrides XRATE_BASE)
    #[arg(long, global = true)]
    base: Option<String>,

    /// Refresh timeout in seconds (overrides XRATE_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Staleness threshold in seconds (overrides XRATE_MAX_AGE_SECS)
    #[arg(long, global = true)]
    max_age_secs: Option<i64>,

    /// Do not contact the rate source; use the embedded table
    #[arg(long, global = true)]
    offline: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the current rate table
    Rates,

    /// Convert an amount between currencies
    Convert {
        amount: f64,
        from: String,
        /// Target currency (defaults to the base currency)
        to: Option<String>,
    },

    /// Print the exchange rate between two currencies
    Rate {
        from: String,
        /// Target currency (defaults to the base currency)
        to: Option<String>,
    },

    /// Format a base-currency amount in another currency
    Format {
        amount: f64,
        code: String,
        /// Symbol to prefix (defaults to the currency's usual symbol)
        #[arg(long)]
        symbol: Option<String>,
    },

    /// Keep rates fresh, refreshing whenever they go stale
    Watch {
        /// Seconds between staleness checks
        #[arg(long, default_value = "60")]
        interval: u64,

        /// Stop after this many checks
        #[arg(long)]
        iterations: Option<u64>,
    },
}

/// Log output layer. Both formats write to stderr; stdout carries command output.
fn log_layer<S>(json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    }
}

fn init_logging(json: bool) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(log_layer(json))
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<ResolverConfig> {
    let mut config = ResolverConfig::from_env();

    if let Some(endpoint) = &args.endpoint {
        config.endpoint = endpoint.clone();
    }
    if let Some(base) = &args.base {
        config.base = base.parse()?;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = args.max_age_secs {
        config.max_age = max_age_from_secs(secs)
            .ok_or_else(|| anyhow::anyhow!("--max-age-secs {} is out of range", secs))?;
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = load_config(&args)?;
    info!(endpoint = %config.endpoint, base = %config.base, "Starting xrate");

    let resolver = Arc::new(RateResolver::from_config(config)?);

    if !matches!(args.command, Command::Watch { .. }) {
        if let Some(RateFetch::StaleFallback { reason, .. }) =
            commands::prime(&resolver, args.offline).await
        {
            warn!(error = %reason, "Using fallback rates");
        }
    }

    let base = resolver.base().to_string();
    match args.command {
        Command::Rates => print!("{}", commands::rates(&resolver)),
        Command::Convert { amount, from, to } => {
            let to = to.unwrap_or_else(|| base.clone());
            println!("{}", commands::convert(&resolver, amount, &from, &to));
        }
        Command::Rate { from, to } => {
            let to = to.unwrap_or_else(|| base.clone());
            println!("{}", commands::rate(&resolver, &from, &to));
        }
        Command::Format {
            amount,
            code,
            symbol,
        } => {
            let formatter = AmountFormatter::new(resolver.clone());
            println!(
                "{}",
                commands::format(&formatter, amount, &code, symbol.as_deref())
            );
        }
        Command::Watch {
            interval,
            iterations,
        } => {
            if args.offline {
                anyhow::bail!("watch needs network access; drop --offline");
            }
            let stats =
                commands::watch(&resolver, Duration::from_secs(interval.max(1)), iterations).await;

            info!("Watch complete");
            info!("Refresh attempts: {}", stats.attempts);
            info!("Successful: {}", stats.successes);
            info!("Failed: {}", stats.failures);
            info!("Skipped (fresh): {}", stats.skipped);
            info!("Success rate: {:.0}%", stats.success_rate() * 100.0);
            info!("Average latency: {}ms", stats.average_latency_ms());
            if let Some(code) = stats.last_error {
                info!("Last error: {}", code);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrate_common::CurrencyCode;

    #[test]
    fn test_base_flag_reaches_resolver() {
        let args = Args::parse_from(["xrate", "--base", "eur", "--offline", "rates"]);

        let config = load_config(&args).unwrap();
        let resolver = RateResolver::from_config(config).unwrap();

        assert_eq!(resolver.base(), &CurrencyCode::eur());
        assert_eq!(resolver.snapshot().rates.rate("EUR"), Some(1.0));
    }

    #[test]
    fn test_overflowing_max_age_is_an_error() {
        let args = Args::parse_from(["xrate", "--max-age-secs", "9223372036854775807", "rates"]);

        assert!(load_config(&args).is_err());
    }

    #[test]
    fn test_max_age_flag_applies() {
        let args = Args::parse_from(["xrate", "--max-age-secs", "120", "rates"]);

        let config = load_config(&args).unwrap();

        assert_eq!(config.max_age, chrono::Duration::minutes(2));
    }

    #[test]
    fn test_log_layers_build_for_both_formats() {
        for json in [false, true] {
            let subscriber = tracing_subscriber::registry().with(log_layer(json));
            tracing::subscriber::with_default(subscriber, || info!(json, "Logging configured"));
        }
    }
}
