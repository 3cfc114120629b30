//! Limit-price derivation from quotes.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::models::{OrderAction, Quote};

/// One-cent nudge applied to derived limit prices.
const TICK: Decimal = dec!(0.01);

/// Derive a limit price from bid/ask for the order-type fallback.
///
/// Buy: max(bid, ask) + 0.01; sell: min(bid, ask) - 0.01; both rounded to
/// two decimals. `None` when either side of the book is missing.
#[must_use]
pub fn derive_limit_price(action: OrderAction, quote: &Quote) -> Option<Decimal> {
    let bid = quote.bid?;
    let ask = quote.ask?;

    let price = match action {
        OrderAction::Buy => bid.max(ask) + TICK,
        OrderAction::Sell => bid.min(ask) - TICK,
    };
    Some(price.round_dp(2))
}

/// Entry limit price for quote-priced backends, derived from the last
/// trade: buys go out at the quote, sells a cent under it.
#[must_use]
pub fn entry_limit_price(action: OrderAction, quote: &Quote) -> Option<Decimal> {
    let last = quote.last?;
    let price = match action {
        OrderAction::Buy => last,
        OrderAction::Sell => last - TICK,
    };
    Some(price.round_dp(2))
}
