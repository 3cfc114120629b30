//! Engine configuration from environment variables.
//!
//! Credential strings live in per-brokerage env vars (`ROBINHOOD`, `SCHWAB`,
//! `SOFI`), one comma-separated list of `user:pass[:totp][:suffix]` entries
//! per variable. Account-selection overrides follow the
//! `<BROKERAGE>_ACCOUNT_NUMBERS` / `<BROKERAGE>_ACCOUNT_SUFFIX` convention.

mod credentials;

use std::path::PathBuf;
use std::time::Duration;

pub use credentials::{Credential, CredentialError, parse_credentials};

/// Default directory for persisted session artifacts.
pub const DEFAULT_CREDS_DIR: &str = "./creds";

/// Default bound on the external one-time-code relay wait.
pub const DEFAULT_RELAY_TIMEOUT: Duration = Duration::from_secs(300);

/// Account-selection inputs for one brokerage, resolved from the
/// environment once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Explicit allow-list of account numbers; highest priority.
    pub allow_list: Vec<String>,
    /// Account-number suffix hint from the environment (credential hints
    /// take precedence over this).
    pub env_suffix: Option<String>,
}

/// Configured logins for one brokerage.
#[derive(Debug, Clone)]
pub struct BrokerageConfig {
    /// Brokerage name, e.g. "Schwab".
    pub name: String,
    /// Parsed credentials, in configured order.
    pub credentials: Vec<Credential>,
    /// Account-selection overrides.
    pub selection: SelectionConfig,
}

/// Engine configuration parsed from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Brokerages with at least one configured login.
    pub brokerages: Vec<BrokerageConfig>,
    /// Directory for session artifacts.
    pub creds_dir: PathBuf,
    /// Bound on the external code relay wait.
    pub relay_timeout: Duration,
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A credential string failed to parse.
    #[error("{brokerage}: {source}")]
    BadCredentials {
        /// Brokerage whose env var is malformed.
        brokerage: String,
        /// Parse failure.
        #[source]
        source: CredentialError,
    },
}

/// Brokerage env vars the engine understands.
pub const BROKERAGE_VARS: &[&str] = &["ROBINHOOD", "SCHWAB", "SOFI"];

impl EngineConfig {
    /// Load configuration from the process environment.
    ///
    /// Brokerages without a configured env var are skipped, matching the
    /// original "not found, skipping" behavior.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut brokerages = Vec::new();

        for var in BROKERAGE_VARS {
            let Ok(raw) = std::env::var(var) else {
                continue;
            };
            if raw.trim().is_empty() {
                continue;
            }

            let name = display_name(var);
            let credentials =
                parse_credentials(&raw).map_err(|source| ConfigError::BadCredentials {
                    brokerage: name.to_string(),
                    source,
                })?;
            if credentials.is_empty() {
                continue;
            }

            brokerages.push(BrokerageConfig {
                name: name.to_string(),
                credentials,
                selection: selection_from_env(var),
            });
        }

        let creds_dir = std::env::var("CREDS_DIR")
            .map_or_else(|_| PathBuf::from(DEFAULT_CREDS_DIR), PathBuf::from);

        let relay_timeout = std::env::var("OTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map_or(DEFAULT_RELAY_TIMEOUT, Duration::from_secs);

        Ok(Self {
            brokerages,
            creds_dir,
            relay_timeout,
        })
    }
}

/// Read `<VAR>_ACCOUNT_NUMBERS` (colon-separated allow-list) and
/// `<VAR>_ACCOUNT_SUFFIX` for one brokerage.
fn selection_from_env(var: &str) -> SelectionConfig {
    let allow_list = std::env::var(format!("{var}_ACCOUNT_NUMBERS"))
        .map(|v| {
            v.trim()
                .split(':')
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let env_suffix = std::env::var(format!("{var}_ACCOUNT_SUFFIX"))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    SelectionConfig {
        allow_list,
        env_suffix,
    }
}

/// User-facing brokerage name for an env var.
fn display_name(var: &str) -> &'static str {
    match var {
        "ROBINHOOD" => "Robinhood",
        "SCHWAB" => "Schwab",
        _ => "SoFi",
    }
}
