//! Trade Engine Binary
//!
//! Runs holdings reporting or order execution across every configured
//! brokerage login.
//!
//! # Usage
//!
//! ```bash
//! trade-engine holdings
//! trade-engine buy 1 AAPL,MSFT
//! trade-engine sell 0.5 ABC --dry
//! ```
//!
//! # Environment Variables
//!
//! - `ROBINHOOD` / `SCHWAB` / `SOFI`: comma-separated
//!   `user:pass[:totp][:suffix]` login entries
//! - `<BROKERAGE>_ACCOUNT_NUMBERS`: colon-separated trading allow-list
//! - `<BROKERAGE>_ACCOUNT_SUFFIX`: trading-account suffix hint
//! - `CREDS_DIR`: session artifact directory (default: ./creds)
//! - `OTP_TIMEOUT_SECS`: external code relay bound (default: 300)
//! - `RUST_LOG`: log level (default: info)

use std::sync::Arc;

use anyhow::{Context, bail};
use rust_decimal::Decimal;

use trade_engine::broker::robinhood::{RobinhoodClient, RobinhoodConfig};
use trade_engine::broker::schwab::{SchwabClient, SchwabConfig};
use trade_engine::broker::sofi::{SofiClient, SofiConfig};
use trade_engine::{
    BrokerBackend, BrokerageConfig, ConsoleNotifier, EngineConfig, Notifier, OrderAction,
    OrderRequest, RunMode, SessionStore, TwoFactorResolver, run_brokerage,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_cli(&args) {
        Ok(mode) => mode,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("usage: trade-engine holdings | trade-engine <buy|sell> <amount> <SYMBOLS> [--dry]");
            std::process::exit(2);
        }
    };

    let config = EngineConfig::from_env().context("failed to load configuration")?;
    if config.brokerages.is_empty() {
        bail!("no brokerage credentials configured; set ROBINHOOD, SCHWAB, or SOFI");
    }

    let store = Arc::new(
        SessionStore::open(&config.creds_dir).context("failed to open session store")?,
    );
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier::new());
    let two_factor = TwoFactorResolver::new().with_relay_timeout(config.relay_timeout);

    let engine = run_all(&config, &store, &mode, &two_factor, &notifier);
    tokio::pin!(engine);

    // An operator interrupt never cancels an in-flight submission; the
    // pipelines finish their current step and release their sessions.
    let failures = tokio::select! {
        failures = &mut engine => failures,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, finishing in-flight work");
            notifier.notify("Interrupt received, finishing in-flight work...");
            engine.await
        }
    };

    if failures > 0 {
        bail!("{failures} identit(ies) failed to complete");
    }
    Ok(())
}

/// Run every configured brokerage; returns the number of failed identities.
async fn run_all(
    config: &EngineConfig,
    store: &Arc<SessionStore>,
    mode: &RunMode,
    two_factor: &TwoFactorResolver,
    notifier: &Arc<dyn Notifier>,
) -> usize {
    let mut failures = 0;

    for brokerage in &config.brokerages {
        let outcomes = match brokerage.name.as_str() {
            "Robinhood" => {
                match RobinhoodClient::new(RobinhoodConfig::default()) {
                    Ok(client) => {
                        run_one(client, brokerage, store, mode, two_factor, notifier).await
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to build Robinhood client");
                        failures += 1;
                        continue;
                    }
                }
            }
            "Schwab" => match SchwabClient::new(SchwabConfig::default()) {
                Ok(client) => run_one(client, brokerage, store, mode, two_factor, notifier).await,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build Schwab client");
                    failures += 1;
                    continue;
                }
            },
            _ => match SofiClient::new(SofiConfig::default()) {
                Ok(client) => run_one(client, brokerage, store, mode, two_factor, notifier).await,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build SoFi client");
                    failures += 1;
                    continue;
                }
            },
        };

        for (identity, result) in outcomes {
            if let Err(e) = result {
                tracing::error!(identity = %identity, error = %e, "identity pipeline failed");
                failures += 1;
            }
        }
    }

    failures
}

async fn run_one<B: BrokerBackend + 'static>(
    client: B,
    brokerage: &BrokerageConfig,
    store: &Arc<SessionStore>,
    mode: &RunMode,
    two_factor: &TwoFactorResolver,
    notifier: &Arc<dyn Notifier>,
) -> Vec<(trade_engine::AccountIdentity, Result<(), trade_engine::AuthError>)> {
    run_brokerage(
        Arc::new(client),
        brokerage,
        Arc::clone(store),
        mode,
        two_factor.clone(),
        Arc::clone(notifier),
    )
    .await
}

/// Parse the command line into a run mode.
fn parse_cli(args: &[String]) -> Result<RunMode, String> {
    let Some(command) = args.first() else {
        return Err("missing command".to_string());
    };

    match command.as_str() {
        "holdings" => Ok(RunMode::Holdings),
        "buy" | "sell" => {
            let action = OrderAction::parse(command)
                .ok_or_else(|| format!("unknown action: {command}"))?;
            let amount: Decimal = args
                .get(1)
                .ok_or_else(|| "missing amount".to_string())?
                .parse()
                .map_err(|_| format!("bad amount: {}", args[1]))?;
            if amount <= Decimal::ZERO {
                return Err("amount must be positive".to_string());
            }

            let symbols: Vec<String> = args
                .get(2)
                .ok_or_else(|| "missing symbols".to_string())?
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().to_uppercase())
                .collect();
            if symbols.is_empty() {
                return Err("no symbols given".to_string());
            }

            let dry_run = args.iter().skip(3).any(|a| a == "--dry");
            let mut request = OrderRequest::new(symbols, action, amount);
            if dry_run {
                request = request.dry();
            }
            Ok(RunMode::Trade(request))
        }
        other => Err(format!("unknown command: {other}")),
    }
}

/// Initialize the tracing subscriber with environment filter.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trade_engine=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
