//! SoFi backend: cookie session with CSRF token.
//!
//! Whole-share submissions are quote-priced limit orders; fractional
//! quantities route through the cash-amount market payload. Buy orders are
//! gated on per-account buying power, sell orders on aggregate salable
//! quantity.

mod api_types;
mod client;

pub use client::{SofiClient, SofiConfig, SofiSession};
