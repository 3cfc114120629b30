//! Broker backend port and shared HTTP plumbing.
//!
//! Each brokerage adapter implements [`BrokerBackend`] over its own wire
//! format; the executor and pipeline only ever see this interface plus the
//! adapter's declared [`Capabilities`].

pub mod fallback;
pub mod http;
pub mod robinhood;
pub mod schwab;
pub mod sofi;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::Credential;
use crate::error::{AuthError, QuoteError};
use crate::models::{Account, AccountIdentity, OrderResponse, OrderTicket, Position, Quote};
use crate::notify::Notifier;
use crate::session::TwoFactorResolver;

/// Which fallback axis an adapter supports after a failed primary
/// submission. Never more than one per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackAxis {
    /// No fallback; primary failure is terminal.
    #[default]
    None,
    /// Resubmit as a limit order at a bid/ask-derived price.
    LimitOrder,
    /// Resubmit through a legacy API generation with identical parameters.
    LegacyApi,
}

/// Capability flags that drive the executor's state machine per backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities {
    /// Fallback axis after a failed primary submission.
    pub fallback: FallbackAxis,
    /// Primary submissions are limit orders priced from the current quote.
    pub quote_priced_entry: bool,
    /// Per-account buying power is checked before buy submissions.
    pub buying_power_gate: bool,
    /// Sell requests verify aggregate salable quantity before submitting.
    pub verify_holdings_before_sell: bool,
    /// Sell iteration stops after the first successful sale.
    pub sell_first_success: bool,
}

/// Broker-level failure from a backend call.
#[derive(Debug, Error, Clone)]
pub enum BrokerError {
    /// Transport or validation failure; drives the fallback axis.
    #[error("transport error: {0}")]
    Transport(String),

    /// The session is no longer accepted by the backend.
    #[error("session expired")]
    SessionExpired,

    /// Backend API returned a structured error.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code or HTTP status.
        code: String,
        /// Error message.
        message: String,
    },

    /// The operation is not part of this backend's surface.
    #[error("operation not supported by this backend")]
    Unsupported,
}

/// A per-account salable position for sell-side verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalablePosition {
    /// Backend reference of the holding account.
    pub account_ref: String,
    /// Immediately sellable quantity.
    pub quantity: Decimal,
}

/// Port implemented by every brokerage adapter.
///
/// `Session` is the backend's opaque authenticated handle; it is owned by
/// the registry entry that created it and released through [`Self::logout`]
/// on every exit path.
#[async_trait]
pub trait BrokerBackend: Send + Sync {
    /// Opaque authenticated session handle.
    type Session: Send + Sync + 'static;

    /// Brokerage name, e.g. "Robinhood".
    fn name(&self) -> &'static str;

    /// Capability flags for the executor.
    fn capabilities(&self) -> Capabilities;

    /// Revive a session from a stored artifact. An error is a cache miss.
    async fn restore_session(
        &self,
        artifact: serde_json::Value,
    ) -> Result<Self::Session, AuthError>;

    /// Lightweight liveness check for a revived session.
    async fn probe(&self, session: &Self::Session) -> bool;

    /// Full credential login; resolves a two-factor challenge when the
    /// backend raises one.
    async fn login(
        &self,
        identity: &AccountIdentity,
        credential: &Credential,
        two_factor: &TwoFactorResolver,
        notifier: &dyn Notifier,
    ) -> Result<Self::Session, AuthError>;

    /// Serialize a session into a storable artifact.
    fn artifact(&self, session: &Self::Session) -> serde_json::Value;

    /// Release the session. Called on every pipeline exit path.
    async fn logout(&self, session: Self::Session);

    /// Discover the accounts reachable through a session.
    async fn accounts(&self, session: &Self::Session) -> Result<Vec<Account>, BrokerError>;

    /// Open positions for one account.
    async fn positions(
        &self,
        session: &Self::Session,
        account: &Account,
    ) -> Result<Vec<Position>, BrokerError>;

    /// Resolve a position's symbol through an instrument lookup.
    ///
    /// Only meaningful for backends whose position records can lack a
    /// direct symbol field.
    async fn resolve_symbol(
        &self,
        _session: &Self::Session,
        _position: &Position,
    ) -> Result<Option<String>, BrokerError> {
        Ok(None)
    }

    /// Bid/ask/last quote for a symbol.
    async fn quote(&self, session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError>;

    /// Submit through the primary path.
    async fn submit(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError>;

    /// Submit through the backend's fallback path (limit order or legacy
    /// API, per [`Capabilities::fallback`]).
    async fn submit_fallback(
        &self,
        _session: &Self::Session,
        _ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        Err(BrokerError::Unsupported)
    }

    /// Available buying power for an account, where the backend exposes it
    /// pre-submission.
    async fn buying_power(
        &self,
        _session: &Self::Session,
        _account: &Account,
    ) -> Result<Option<Decimal>, BrokerError> {
        Ok(None)
    }

    /// Salable quantity per account for a symbol, for sell-side
    /// verification.
    async fn salable_positions(
        &self,
        _session: &Self::Session,
        _symbol: &str,
    ) -> Result<Vec<SalablePosition>, BrokerError> {
        Ok(Vec::new())
    }
}
