//! Console notifier: prints progress text and prompts for relayed codes.

use std::time::Duration;

use async_trait::async_trait;

use super::{Notifier, RelayError};

/// Notifier backed by stdout/stdin.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    fn notify(&self, text: &str) {
        println!("{text}");
    }

    async fn request_code(&self, label: &str, timeout: Duration) -> Result<String, RelayError> {
        println!("{label}: enter the one-time code:");

        let read_line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .map(|_| line.trim().to_string())
        });

        match tokio::time::timeout(timeout, read_line).await {
            Ok(Ok(Ok(code))) if !code.is_empty() => Ok(code),
            Ok(_) => Err(RelayError::Closed),
            Err(_) => Err(RelayError::Timeout {
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}
