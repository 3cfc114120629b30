//! Order requests, tickets, and results.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    /// Buy shares.
    Buy,
    /// Sell shares.
    Sell,
}

impl OrderAction {
    /// Lowercase wire form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Parse from a user-supplied action word.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "buy" => Some(Self::Buy),
            "sell" => Some(Self::Sell),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One order request: the same action and amount applied to every symbol
/// and every selected account. Immutable for the duration of a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    /// Symbols in submission order.
    pub symbols: Vec<String>,
    /// Buy or sell.
    pub action: OrderAction,
    /// Share quantity; values below 1 are fractional.
    pub amount: Decimal,
    /// Evaluate and report without contacting the submission collaborator.
    pub dry_run: bool,
}

impl OrderRequest {
    /// Create a request.
    #[must_use]
    pub fn new(symbols: Vec<String>, action: OrderAction, amount: Decimal) -> Self {
        Self {
            symbols,
            action,
            amount,
            dry_run: false,
        }
    }

    /// Mark the request as a dry run.
    #[must_use]
    pub const fn dry(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Quantities below one share route through the fractional payload shape.
    #[must_use]
    pub fn is_fractional(&self) -> bool {
        self.amount < Decimal::ONE
    }
}

/// Order pricing shape for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketType {
    /// Market order.
    Market,
    /// Limit order at the given price.
    Limit(Decimal),
}

impl TicketType {
    /// Limit price, when this is a limit ticket.
    #[must_use]
    pub const fn limit_price(&self) -> Option<Decimal> {
        match self {
            Self::Market => None,
            Self::Limit(price) => Some(*price),
        }
    }
}

/// One concrete submission to a backend: a single (symbol, account) attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTicket {
    /// Symbol to trade.
    pub symbol: String,
    /// Share quantity (may be fractional).
    pub quantity: Decimal,
    /// Buy or sell.
    pub action: OrderAction,
    /// Backend reference of the target account.
    pub account_ref: String,
    /// Market or limit.
    pub order_type: TicketType,
}

/// Structured response from an order-submission primitive.
///
/// A response with `succeeded == false` is a backend-reported business or
/// validation failure, not a transport error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResponse {
    /// Whether the backend accepted the order.
    pub succeeded: bool,
    /// Raw backend messages, useful for the known-error table.
    pub messages: Vec<String>,
}

impl OrderResponse {
    /// An accepted order.
    #[must_use]
    pub const fn accepted() -> Self {
        Self {
            succeeded: true,
            messages: Vec::new(),
        }
    }

    /// A backend-refused order with its raw messages.
    #[must_use]
    pub const fn refused(messages: Vec<String>) -> Self {
        Self {
            succeeded: false,
            messages,
        }
    }
}

/// Terminal outcome of one (account, symbol) attempt.
///
/// Exactly one is produced per attempt and routed to the notifier; results
/// are never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderResult {
    /// Account number the attempt targeted (empty when no account was
    /// selectable).
    pub account_number: String,
    /// Symbol the attempt targeted.
    pub symbol: String,
    /// Whether the attempt succeeded.
    pub succeeded: bool,
    /// Human-readable outcome.
    pub message: String,
    /// Price used for limit-priced submissions.
    pub price_used: Option<Decimal>,
}

impl OrderResult {
    /// A successful attempt.
    #[must_use]
    pub fn success(account_number: &str, symbol: &str, message: impl Into<String>) -> Self {
        Self {
            account_number: account_number.to_string(),
            symbol: symbol.to_string(),
            succeeded: true,
            message: message.into(),
            price_used: None,
        }
    }

    /// A failed attempt.
    #[must_use]
    pub fn failure(account_number: &str, symbol: &str, message: impl Into<String>) -> Self {
        Self {
            account_number: account_number.to_string(),
            symbol: symbol.to_string(),
            succeeded: false,
            message: message.into(),
            price_used: None,
        }
    }

    /// Attach the limit price the attempt used.
    #[must_use]
    pub const fn with_price(mut self, price: Decimal) -> Self {
        self.price_used = Some(price);
        self
    }
}
