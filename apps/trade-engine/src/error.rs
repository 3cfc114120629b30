//! Engine-level error taxonomy.
//!
//! Only `AuthError` may abort an identity's pipeline; everything else is
//! caught at the per-item boundary and converted into a reported result.

use thiserror::Error;

/// Session acquisition failed. Aborts the affected identity's pipeline;
/// sibling identities proceed.
#[derive(Debug, Error, Clone)]
pub enum AuthError {
    /// Credential login was rejected by the backend.
    #[error("{label}: login rejected: {reason}")]
    LoginRejected {
        /// Login label.
        label: String,
        /// Backend-reported reason.
        reason: String,
    },

    /// The two-factor challenge was not resolved in time.
    #[error("two-factor code not received within {timeout_secs}s")]
    TwoFactorTimeout {
        /// Configured relay timeout.
        timeout_secs: u64,
    },

    /// Cached session is invalid and no credential is available to retry.
    #[error("cached session invalid and no credential configured")]
    NoCredential,

    /// The backend could not be reached during login.
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    /// Session artifact existed but could not be revived.
    #[error("stored session could not be revived: {0}")]
    StaleSession(String),
}

/// Price lookup failed. Recovered locally by callers: a sentinel price in
/// holdings collection, a hard stop for the (symbol, account) pair in
/// order execution.
#[derive(Debug, Error, Clone)]
#[error("quote lookup failed for {symbol}: {message}")]
pub struct QuoteError {
    /// Symbol the lookup was for.
    pub symbol: String,
    /// Failure detail.
    pub message: String,
}

impl QuoteError {
    /// Create a quote error.
    #[must_use]
    pub fn new(symbol: &str, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}
