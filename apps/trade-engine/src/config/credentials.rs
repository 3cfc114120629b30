//! Credential parsing for colon-delimited account strings.
//!
//! One brokerage env var holds a comma-separated list of logins, each
//! `user:pass[:totp_seed][:account_suffix]`. A totp slot of `NA`, `none`,
//! or `false` (any case) means no seed is configured.

use thiserror::Error;

/// Parsed login credential for one brokerage account string.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Login username or email.
    pub username: String,
    /// Login secret.
    pub secret: String,
    /// Base32 TOTP seed, when the login uses an authenticator app.
    pub totp_seed: Option<String>,
    /// Account-number suffix hint for trading-account selection.
    pub account_selector_hint: Option<String>,
}

impl Credential {
    /// Create a plain username/secret credential.
    #[must_use]
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
            totp_seed: None,
            account_selector_hint: None,
        }
    }

    /// Attach a TOTP seed.
    #[must_use]
    pub fn with_totp_seed(mut self, seed: impl Into<String>) -> Self {
        self.totp_seed = Some(seed.into());
        self
    }

    /// Attach an account-suffix hint.
    #[must_use]
    pub fn with_account_hint(mut self, hint: impl Into<String>) -> Self {
        self.account_selector_hint = Some(hint.into());
        self
    }
}

// The secret never appears in logs, even at debug level.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .field("totp_seed", &self.totp_seed.as_ref().map(|_| "<redacted>"))
            .field("account_selector_hint", &self.account_selector_hint)
            .finish()
    }
}

/// Credential string could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// An entry had fewer than the two required fields.
    ///
    /// Only the position is named, never the content.
    #[error("credential entry {position} is malformed: expected user:pass[:totp][:suffix]")]
    Malformed {
        /// 1-based position in the configured list.
        position: usize,
    },
}

/// Slot values that mean "no TOTP seed".
const ABSENT_MARKERS: &[&str] = &["na", "none", "false"];

fn optional_field(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || ABSENT_MARKERS.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a comma-separated list of colon-delimited login entries.
pub fn parse_credentials(raw: &str) -> Result<Vec<Credential>, CredentialError> {
    let mut credentials = Vec::new();

    for (index, entry) in raw.trim().split(',').enumerate() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let fields: Vec<&str> = entry.split(':').collect();
        if fields.len() < 2 || fields[0].is_empty() || fields[1].is_empty() {
            return Err(CredentialError::Malformed {
                position: index + 1,
            });
        }

        credentials.push(Credential {
            username: fields[0].to_string(),
            secret: fields[1].to_string(),
            totp_seed: fields.get(2).and_then(|f| optional_field(f)),
            account_selector_hint: fields.get(3).and_then(|f| optional_field(f)),
        });
    }

    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_entry() {
        let creds = parse_credentials("user@x.com:hunter2:JBSWY3DPEHPK3PXP:8142").unwrap();
        assert_eq!(creds.len(), 1);
        assert_eq!(creds[0].username, "user@x.com");
        assert_eq!(creds[0].secret, "hunter2");
        assert_eq!(creds[0].totp_seed.as_deref(), Some("JBSWY3DPEHPK3PXP"));
        assert_eq!(creds[0].account_selector_hint.as_deref(), Some("8142"));
    }

    #[test]
    fn na_totp_slot_means_absent() {
        for marker in ["NA", "na", "none", "False"] {
            let raw = format!("user:pass:{marker}:8142");
            let creds = parse_credentials(&raw).unwrap();
            assert_eq!(creds[0].totp_seed, None, "marker {marker}");
            assert_eq!(creds[0].account_selector_hint.as_deref(), Some("8142"));
        }
    }

    #[test]
    fn multiple_entries_keep_order() {
        let creds = parse_credentials("a:1,b:2:NA,c:3").unwrap();
        let names: Vec<&str> = creds.iter().map(|c| c.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn malformed_entry_names_position_not_content() {
        let err = parse_credentials("good:pass,justauser").unwrap_err();
        assert_eq!(err, CredentialError::Malformed { position: 2 });
        assert!(!err.to_string().contains("justauser"));
    }

    #[test]
    fn debug_never_prints_secret() {
        let cred = Credential::new("user", "hunter2").with_totp_seed("SEED");
        let rendered = format!("{cred:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("SEED"));
    }

    #[test]
    fn empty_entries_are_skipped() {
        let creds = parse_credentials(" a:1, ,b:2 ").unwrap();
        assert_eq!(creds.len(), 2);
    }
}
