//! Two-factor challenge resolution.
//!
//! A pending challenge resolves either by local TOTP derivation (seed
//! configured, deterministic, no wait) or by an externally relayed code
//! with a bounded wait. Local derivation wins when both paths are open.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::config::Credential;
use crate::error::AuthError;
use crate::notify::{Notifier, RelayError};

/// A pending two-factor challenge as detected by a backend login flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    /// No challenge; resolution short-circuits.
    None,
    /// A one-time code is required.
    CodeRequired {
        /// Login label, used when prompting the operator.
        label: String,
    },
}

/// Challenge resolution failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TwoFactorError {
    /// The external relay did not produce a code in time.
    #[error("{0}")]
    Relay(#[from] RelayError),

    /// The configured TOTP seed is not valid base32.
    #[error("TOTP seed is not valid base32")]
    BadSeed,
}

impl TwoFactorError {
    /// Convert into the auth-level failure a login flow reports.
    #[must_use]
    pub fn into_auth_error(self, label: &str) -> AuthError {
        match self {
            Self::Relay(RelayError::Timeout { timeout_secs }) => {
                AuthError::TwoFactorTimeout { timeout_secs }
            }
            other => AuthError::LoginRejected {
                label: label.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Resolves pending challenges to one-time codes.
#[derive(Debug, Clone)]
pub struct TwoFactorResolver {
    relay_timeout: Duration,
}

impl Default for TwoFactorResolver {
    fn default() -> Self {
        Self {
            relay_timeout: crate::config::DEFAULT_RELAY_TIMEOUT,
        }
    }
}

impl TwoFactorResolver {
    /// Create a resolver with the default 300s relay bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the relay wait bound.
    #[must_use]
    pub const fn with_relay_timeout(mut self, timeout: Duration) -> Self {
        self.relay_timeout = timeout;
        self
    }

    /// Resolve a challenge to a code.
    ///
    /// Returns `None` when there is no challenge. A configured TOTP seed
    /// takes priority and never touches the relay.
    pub async fn resolve(
        &self,
        challenge: &Challenge,
        credential: &Credential,
        notifier: &dyn Notifier,
    ) -> Result<Option<String>, TwoFactorError> {
        let Challenge::CodeRequired { label } = challenge else {
            return Ok(None);
        };

        if let Some(seed) = &credential.totp_seed {
            let code = derive_totp_at(seed, unix_now())?;
            tracing::debug!(label = %label, "two-factor code derived locally");
            return Ok(Some(code));
        }

        tracing::info!(
            label = %label,
            timeout_secs = self.relay_timeout.as_secs(),
            "waiting for externally relayed code"
        );
        let code = notifier.request_code(label, self.relay_timeout).await?;
        Ok(Some(code))
    }
}

/// Derive the RFC 6238 code for a base32 seed at a unix timestamp.
///
/// Deterministic: the same seed and timestamp always produce the same code.
pub fn derive_totp_at(seed: &str, unix_time: u64) -> Result<String, TwoFactorError> {
    let bytes = Secret::Encoded(seed.trim().to_uppercase())
        .to_bytes()
        .map_err(|_| TwoFactorError::BadSeed)?;
    // Seeds shorter than 128 bits are common for brokerage authenticators;
    // new_unchecked skips the RFC 4226 length floor.
    let totp = TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, bytes);
    Ok(totp.generate(unix_time))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
