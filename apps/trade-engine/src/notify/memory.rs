//! In-memory notifier for tests and scripted runs.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{Notifier, RelayError};

/// Notifier that records every message and serves pre-seeded relay codes.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<String>>,
    codes: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a code for the next `request_code` call.
    pub fn push_code(&self, code: impl Into<String>) {
        if let Ok(mut codes) = self.codes.lock() {
            codes.push(code.into());
        }
    }

    /// Snapshot of every notified message, in order.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Whether any recorded message contains `needle`.
    #[must_use]
    pub fn saw(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    fn notify(&self, text: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(text.to_string());
        }
    }

    async fn request_code(&self, _label: &str, timeout: Duration) -> Result<String, RelayError> {
        let code = self.codes.lock().ok().and_then(|mut codes| {
            if codes.is_empty() {
                None
            } else {
                Some(codes.remove(0))
            }
        });

        code.ok_or(RelayError::Timeout {
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_messages_in_order() {
        let notifier = MemoryNotifier::new();
        notifier.notify("first");
        notifier.notify("second");
        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert!(notifier.saw("sec"));
    }

    #[tokio::test]
    async fn serves_seeded_codes_then_times_out() {
        let notifier = MemoryNotifier::new();
        notifier.push_code("123456");

        let code = notifier
            .request_code("SoFi 1", Duration::from_secs(1))
            .await;
        assert_eq!(code, Ok("123456".to_string()));

        let empty = notifier
            .request_code("SoFi 1", Duration::from_secs(1))
            .await;
        assert_eq!(empty, Err(RelayError::Timeout { timeout_secs: 1 }));
    }
}
