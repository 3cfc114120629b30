//! Notification port: user-visible progress text and out-of-band code relay.
//!
//! The channel is append-only and safe for concurrent use; every identity
//! pipeline shares one notifier.

mod console;
mod memory;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use console::ConsoleNotifier;
pub use memory::MemoryNotifier;

/// External code relay failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No code arrived within the bounded wait.
    #[error("no code received within {timeout_secs}s")]
    Timeout {
        /// Configured wait in seconds.
        timeout_secs: u64,
    },

    /// The relay channel is gone.
    #[error("code relay channel closed")]
    Closed,
}

/// Port for all user-visible output and for relaying one-time codes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fire-and-forget progress or error text.
    fn notify(&self, text: &str);

    /// Ask the operator for a one-time code, waiting up to `timeout`.
    ///
    /// Used only by the two-factor external-relay state.
    async fn request_code(&self, label: &str, timeout: Duration) -> Result<String, RelayError>;
}
