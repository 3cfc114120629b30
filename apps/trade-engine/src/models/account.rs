//! Identities, accounts, holdings, and quotes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One configured login at a brokerage, e.g. `("SoFi", "SoFi 2")`.
///
/// Created once at login time and never mutated. The label doubles as the
/// session-cache key for the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountIdentity {
    /// Brokerage name, e.g. "Schwab".
    pub brokerage: String,
    /// Login label, e.g. "Schwab 2".
    pub label: String,
}

impl AccountIdentity {
    /// Build the identity for the `index`-th configured login (1-based).
    #[must_use]
    pub fn new(brokerage: &str, index: usize) -> Self {
        Self {
            brokerage: brokerage.to_string(),
            label: format!("{brokerage} {index}"),
        }
    }

    /// Key under which this identity's session artifact is persisted.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.label.clone()
    }
}

impl std::fmt::Display for AccountIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A discovered brokerage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Customer-facing account number.
    pub number: String,
    /// Account type description, when the backend reports one.
    pub kind: Option<String>,
    /// Cash or total value as reported at discovery time.
    pub value: Decimal,
    /// Backend-internal account reference, where it differs from the number.
    pub internal_ref: Option<String>,
}

impl Account {
    /// Create an account with just a number and value.
    #[must_use]
    pub fn new(number: impl Into<String>, value: Decimal) -> Self {
        Self {
            number: number.into(),
            kind: None,
            value,
            internal_ref: None,
        }
    }

    /// Set the account type description.
    #[must_use]
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// Set the backend-internal reference.
    #[must_use]
    pub fn with_internal_ref(mut self, internal_ref: impl Into<String>) -> Self {
        self.internal_ref = Some(internal_ref.into());
        self
    }

    /// The reference used when talking to the backend: internal when present,
    /// account number otherwise.
    #[must_use]
    pub fn backend_ref(&self) -> &str {
        self.internal_ref.as_deref().unwrap_or(&self.number)
    }
}

/// A stored position: symbol, share count, and last known price.
///
/// `price` of 0.00 is the "price unavailable" sentinel; the collector logs
/// when it records one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Resolved ticker symbol.
    pub symbol: String,
    /// Share quantity; never negative.
    pub quantity: Decimal,
    /// Per-share price, 2 decimal places.
    pub price: Decimal,
}

impl Holding {
    /// Position value at the recorded price.
    #[must_use]
    pub fn market_value(&self) -> Decimal {
        (self.quantity * self.price).round_dp(2)
    }
}

/// A raw position as returned by a backend, before symbol resolution.
#[derive(Debug, Clone, Default)]
pub struct Position {
    /// Direct symbol field, when the backend provides one.
    pub symbol: Option<String>,
    /// Instrument reference (URL or id) for fallback symbol resolution.
    pub instrument_ref: Option<String>,
    /// Share quantity.
    pub quantity: Decimal,
    /// Inline per-share price, when the backend reports one.
    pub price: Option<Decimal>,
}

/// Bid/ask/last snapshot from the quote primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quote {
    /// Best bid.
    pub bid: Option<Decimal>,
    /// Best ask.
    pub ask: Option<Decimal>,
    /// Last traded price.
    pub last: Option<Decimal>,
}

/// Mask an account number for user-visible output, keeping the last two
/// characters.
#[must_use]
pub fn mask_account(number: &str) -> String {
    let len = number.chars().count();
    if len <= 2 {
        return "*".repeat(len);
    }
    let visible: String = number.chars().skip(len - 2).collect();
    format!("{}{visible}", "*".repeat(len - 2))
}
