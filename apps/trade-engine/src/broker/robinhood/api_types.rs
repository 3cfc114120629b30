//! Robinhood API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth
// ============================================================================

/// Token request for the OAuth password grant.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    /// Login username.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Always "password".
    pub grant_type: String,
    /// Public client id.
    pub client_id: String,
    /// Requested scope.
    pub scope: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    /// One-time code when a challenge is pending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_code: Option<String>,
}

/// Token response; also carries the challenge flag.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token on success.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Granted lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Set when the backend wants a one-time code.
    #[serde(default)]
    pub mfa_required: Option<bool>,
    /// Error detail on rejection.
    #[serde(default)]
    pub detail: Option<String>,
}

// ============================================================================
// Accounts and positions
// ============================================================================

/// Paged results wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Paged<T> {
    /// Page of records.
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// One account record.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    /// Account number.
    pub account_number: String,
    /// Account type, e.g. "individual".
    #[serde(default)]
    pub brokerage_account_type: Option<String>,
    /// Cash balance as a string.
    #[serde(default)]
    pub portfolio_cash: Option<String>,
}

/// One open stock position.
///
/// The symbol field is present on some responses only; otherwise it is
/// resolved through the instrument URL.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRecord {
    /// Direct symbol, when included.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Instrument URL for fallback resolution.
    #[serde(default)]
    pub instrument: Option<String>,
    /// Share quantity as a string.
    pub quantity: String,
}

/// Instrument lookup response.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentRecord {
    /// Ticker symbol.
    #[serde(default)]
    pub symbol: Option<String>,
}

// ============================================================================
// Quotes and orders
// ============================================================================

/// Quote response, prices as strings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRecord {
    /// Best bid.
    #[serde(default)]
    pub bid_price: Option<String>,
    /// Best ask.
    #[serde(default)]
    pub ask_price: Option<String>,
    /// Last trade.
    #[serde(default)]
    pub last_trade_price: Option<String>,
}

/// Order submission payload.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    /// Target account number.
    pub account_number: String,
    /// Symbol.
    pub symbol: String,
    /// Share quantity.
    pub quantity: Decimal,
    /// "buy" or "sell".
    pub side: String,
    /// Order type: "market" or "limit".
    #[serde(rename = "type")]
    pub order_type: String,
    /// Good-for-day.
    pub time_in_force: String,
    /// Limit price, for limit orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
}

/// Order submission response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderRecord {
    /// Order id on acceptance.
    #[serde(default)]
    pub id: Option<String>,
    /// Field-independent rejection messages.
    #[serde(default)]
    pub non_field_errors: Option<Vec<String>>,
    /// Error detail.
    #[serde(default)]
    pub detail: Option<String>,
}

impl OrderRecord {
    /// Rejection messages carried by this record, if any.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        let mut messages = self.non_field_errors.clone().unwrap_or_default();
        if let Some(detail) = &self.detail {
            messages.push(detail.clone());
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_payload_skips_absent_price() {
        let payload = OrderPayload {
            account_number: "111".to_string(),
            symbol: "AAPL".to_string(),
            quantity: Decimal::ONE,
            side: "buy".to_string(),
            order_type: "market".to_string(),
            time_in_force: "gfd".to_string(),
            price: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("price").is_none());
        assert_eq!(json["type"], "market");
    }

    #[test]
    fn order_record_collects_messages() {
        let record: OrderRecord = serde_json::from_str(
            r#"{"non_field_errors": ["Not enough shares"], "detail": "rejected"}"#,
        )
        .unwrap();
        assert_eq!(record.messages(), vec!["Not enough shares", "rejected"]);
        assert!(record.id.is_none());
    }

    #[test]
    fn token_response_challenge_flag() {
        let resp: TokenResponse = serde_json::from_str(r#"{"mfa_required": true}"#).unwrap();
        assert_eq!(resp.mfa_required, Some(true));
        assert!(resp.access_token.is_none());
    }
}
