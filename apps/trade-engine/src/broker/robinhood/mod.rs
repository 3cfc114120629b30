//! Robinhood backend: REST trading API with a token session.
//!
//! Primary submissions are market orders; the fallback axis recomputes a
//! limit price from the current bid/ask and resubmits as a limit order.

mod api_types;
mod client;

pub use client::{RobinhoodClient, RobinhoodConfig, RobinhoodSession};
