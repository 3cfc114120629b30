// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Trade Engine - Rust Core Library
//!
//! Cross-brokerage session and order-execution engine. One order request
//! fans out across every configured brokerage login: each identity gets an
//! isolated pipeline that acquires a session (cache-first, credential
//! fallback), aggregates accounts and holdings, and either reports
//! positions or executes the order with the backend's fallback chain.
//!
//! # Layout
//!
//! - `models`: identities, accounts, holdings, orders, results
//! - `config`: env-driven configuration and credential parsing
//! - `session`: artifact store, cache-first acquisition, two-factor codes
//! - `registry`: per-identity account/holdings aggregate
//! - `broker`: backend port plus the Robinhood/Schwab/SoFi adapters
//! - `holdings`: fault-tolerant collection and reporting
//! - `executor`: the order-execution state machine
//! - `pipeline`: per-identity orchestration and concurrency
//! - `notify`: user-visible output and one-time-code relay

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod broker;
pub mod config;
pub mod error;
pub mod executor;
pub mod holdings;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod registry;
pub mod session;

pub use broker::{BrokerBackend, BrokerError, Capabilities, FallbackAxis, SalablePosition};
pub use config::{BrokerageConfig, Credential, EngineConfig, SelectionConfig};
pub use error::{AuthError, QuoteError};
pub use executor::{OrderExecutor, SelectionPolicy};
pub use models::{
    Account, AccountIdentity, Holding, OrderAction, OrderRequest, OrderResponse, OrderResult,
    OrderTicket, Position, Quote, TicketType,
};
pub use notify::{ConsoleNotifier, MemoryNotifier, Notifier};
pub use pipeline::{RunMode, run_brokerage, run_identity};
pub use registry::BrokerageRegistry;
pub use session::{SessionStore, TwoFactorResolver};
