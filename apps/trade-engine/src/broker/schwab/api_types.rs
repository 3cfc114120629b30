//! Schwab API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth
// ============================================================================

/// Login request.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login id.
    pub username: String,
    /// Login password.
    pub password: String,
    /// TOTP code, when an authenticator is enrolled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_code: Option<String>,
}

/// Login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token on success.
    #[serde(default)]
    pub token: Option<String>,
    /// Set when a one-time code is required to continue.
    #[serde(default)]
    pub mfa_required: Option<bool>,
    /// Rejection reason.
    #[serde(default)]
    pub reason: Option<String>,
}

// ============================================================================
// Account snapshot
// ============================================================================

/// Account list response from the account-info call.
///
/// Fetched once at login; accounts and positions both serve from it.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoResponse {
    /// All accounts under the login.
    #[serde(default = "Vec::new")]
    pub accounts: Vec<AccountInfoRecord>,
}

/// One account with its position snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoRecord {
    /// Account id.
    pub account_id: String,
    /// Total account value.
    #[serde(default)]
    pub account_value: Decimal,
    /// Position snapshot.
    #[serde(default = "Vec::new")]
    pub positions: Vec<PositionRecord>,
}

/// One position in the snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    /// Ticker symbol; may be empty for non-equity rows.
    #[serde(default)]
    pub symbol: String,
    /// Market value of the position.
    #[serde(default)]
    pub market_value: Decimal,
    /// Share quantity.
    #[serde(default)]
    pub quantity: Decimal,
}

// ============================================================================
// Quotes and trades
// ============================================================================

/// Quote response.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRecord {
    /// Best bid.
    #[serde(default)]
    pub bid: Option<Decimal>,
    /// Best ask.
    #[serde(default)]
    pub ask: Option<Decimal>,
    /// Last trade.
    #[serde(default)]
    pub last: Option<Decimal>,
}

/// Trade request, shared by the modern and legacy endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct TradeRequest {
    /// Ticker symbol.
    pub ticker: String,
    /// "Buy" or "Sell".
    pub side: String,
    /// Share quantity.
    #[serde(with = "rust_decimal::serde::float")]
    pub qty: Decimal,
    /// Target account id.
    pub account_id: String,
}

/// Trade verification response.
#[derive(Debug, Clone, Deserialize)]
pub struct TradeResponse {
    /// Whether order verification succeeded.
    #[serde(default)]
    pub success: bool,
    /// Verification messages.
    #[serde(default = "Vec::new")]
    pub messages: Vec<String>,
}
