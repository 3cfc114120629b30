//! SoFi API request and response types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ============================================================================
// Auth
// ============================================================================

/// Login request.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    /// Login email.
    pub email: String,
    /// Login password.
    pub password: String,
}

/// Login response; carries the challenge flag.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Set when a one-time code must be verified.
    #[serde(default, rename = "mfaRequired")]
    pub mfa_required: Option<bool>,
    /// Challenge delivery, e.g. "SMS" or "AUTHENTICATOR".
    #[serde(default)]
    pub delivery: Option<String>,
    /// Rejection reason.
    #[serde(default)]
    pub error: Option<String>,
}

/// Challenge verification request.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    /// One-time code.
    pub code: String,
    /// Ask the backend to trust this client.
    #[serde(rename = "rememberBrowser")]
    pub remember_browser: bool,
}

// ============================================================================
// Accounts and holdings
// ============================================================================

/// One account from the account-list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRecord {
    /// Customer-facing account number.
    #[serde(rename = "apexAccountId")]
    pub apex_account_id: String,
    /// Internal account id used by holdings/trade endpoints.
    pub id: String,
    /// Account type wrapper.
    #[serde(default, rename = "type")]
    pub kind: Option<AccountType>,
    /// Total equity value.
    #[serde(default, rename = "totalEquityValue")]
    pub total_equity_value: Decimal,
}

/// Account type wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountType {
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Holdings response for one account.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingsResponse {
    /// Position rows, including a cash row.
    #[serde(default = "Vec::new")]
    pub holdings: Vec<HoldingRecord>,
}

/// One holding row.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingRecord {
    /// Ticker symbol, or `|CASH|` for the cash row.
    #[serde(default)]
    pub symbol: Option<String>,
    /// Share quantity.
    #[serde(default)]
    pub shares: Option<Decimal>,
    /// Per-share price.
    #[serde(default)]
    pub price: Option<Decimal>,
    /// Immediately sellable quantity.
    #[serde(default, rename = "salableQuantity")]
    pub salable_quantity: Option<Decimal>,
}

/// Customer-level holdings lookup for one symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolHoldingsResponse {
    /// Per-account holding info.
    #[serde(default, rename = "accountHoldingInfos")]
    pub account_holding_infos: Vec<AccountHoldingInfo>,
}

/// Salable quantity of one symbol in one account.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountHoldingInfo {
    /// Internal account id.
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Immediately sellable quantity.
    #[serde(default, rename = "salableQuantity")]
    pub salable_quantity: Decimal,
}

/// One funded account with buying power.
#[derive(Debug, Clone, Deserialize)]
pub struct FundedAccountRecord {
    /// Internal account id.
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Available buying power.
    #[serde(default, rename = "accountBuyingPower")]
    pub account_buying_power: Decimal,
    /// Account type description.
    #[serde(default, rename = "accountType")]
    pub account_type: Option<String>,
}

// ============================================================================
// Quotes and orders
// ============================================================================

/// Tearsheet quote response.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteRecord {
    /// Last traded price.
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Whole-share limit order payload.
#[derive(Debug, Clone, Serialize)]
pub struct OrderPayload {
    /// "BUY" or "SELL".
    pub operation: String,
    /// Share quantity as a string.
    pub quantity: String,
    /// Time in force.
    pub time: String,
    /// Order type, always "LIMIT" for whole shares.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Limit price.
    #[serde(rename = "limitPrice", with = "rust_decimal::serde::float")]
    pub limit_price: Decimal,
    /// Symbol.
    pub symbol: String,
    /// Internal account id.
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Trading session.
    #[serde(rename = "tradingSession")]
    pub trading_session: String,
}

/// Fractional-share order payload: cash-amount-based, market type.
#[derive(Debug, Clone, Serialize)]
pub struct FractionalOrderPayload {
    /// "BUY" or "SELL".
    pub operation: String,
    /// Cash amount computed from the live quote.
    #[serde(rename = "cashAmount", with = "rust_decimal::serde::float")]
    pub cash_amount: Decimal,
    /// Fractional share quantity.
    #[serde(with = "rust_decimal::serde::float")]
    pub quantity: Decimal,
    /// Symbol.
    pub symbol: String,
    /// Internal account id.
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Time in force.
    pub time: String,
    /// Order type, always "MARKET" for fractional.
    #[serde(rename = "type")]
    pub order_type: String,
    /// Trading session.
    #[serde(rename = "tradingSession")]
    pub trading_session: String,
    /// Never sell-all through this path.
    #[serde(rename = "sellAll")]
    pub sell_all: bool,
}

/// Order placement response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderPlacedResponse {
    /// Result header; "Your order is placed." on success.
    #[serde(default)]
    pub header: Option<String>,
}

/// Success header returned by the order endpoints.
pub const ORDER_PLACED_HEADER: &str = "Your order is placed.";

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn account_record_parses_wire_names() {
        let body = r#"{
            "apexAccountId": "2KB55555",
            "id": "1017",
            "type": {"description": "Individual"},
            "totalEquityValue": 512.34
        }"#;
        let record: AccountRecord = serde_json::from_str(body).unwrap();
        assert_eq!(record.apex_account_id, "2KB55555");
        assert_eq!(record.id, "1017");
        assert_eq!(record.total_equity_value, dec!(512.34));
        assert_eq!(record.kind.unwrap().description.as_deref(), Some("Individual"));
    }

    #[test]
    fn order_payload_uses_wire_field_names() {
        let payload = OrderPayload {
            operation: "BUY".to_string(),
            quantity: "2".to_string(),
            time: "DAY".to_string(),
            order_type: "LIMIT".to_string(),
            limit_price: dec!(10.06),
            symbol: "XYZ".to_string(),
            account_id: "1017".to_string(),
            trading_session: "CORE_HOURS".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["limitPrice"], serde_json::json!(10.06));
        assert_eq!(json["accountId"], "1017");
        assert_eq!(json["tradingSession"], "CORE_HOURS");
        assert_eq!(json["type"], "LIMIT");
    }

    #[test]
    fn fractional_payload_is_market_typed() {
        let payload = FractionalOrderPayload {
            operation: "SELL".to_string(),
            cash_amount: dec!(5.25),
            quantity: dec!(0.5),
            symbol: "XYZ".to_string(),
            account_id: "1017".to_string(),
            time: "DAY".to_string(),
            order_type: "MARKET".to_string(),
            trading_session: "CORE_HOURS".to_string(),
            sell_all: false,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "MARKET");
        assert_eq!(json["cashAmount"], serde_json::json!(5.25));
        assert_eq!(json["sellAll"], false);
    }
}
