//! Trading-account selection.
//!
//! Priority order: explicit allow-list, account-number suffix hint
//! (credential hint first, then environment), then every discovered
//! account in discovery order. A suffix with no match falls back to the
//! first discovered account, and that fact is reported.

use crate::config::{Credential, SelectionConfig};
use crate::models::Account;

/// Resolved selection policy for one identity.
#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    /// Explicit account-number allow-list.
    pub allow_list: Vec<String>,
    /// Suffix hint, credential-sourced or environment-sourced.
    pub suffix: Option<String>,
}

impl SelectionPolicy {
    /// Combine environment configuration with the credential's hint.
    ///
    /// The credential hint wins over the environment suffix, matching the
    /// configuration precedence of the account strings themselves.
    #[must_use]
    pub fn resolve(config: &SelectionConfig, credential: &Credential) -> Self {
        let suffix = credential
            .account_selector_hint
            .clone()
            .or_else(|| config.env_suffix.clone());
        Self {
            allow_list: config.allow_list.clone(),
            suffix,
        }
    }
}

/// Outcome of account selection for one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Eligible accounts, in selection order.
    pub accounts: Vec<Account>,
    /// Set when a configured suffix matched nothing and the first
    /// discovered account was used instead.
    pub suffix_fallback: bool,
}

/// Select the eligible trading accounts from the discovered set.
#[must_use]
pub fn select_accounts(discovered: &[Account], policy: &SelectionPolicy) -> Selection {
    if !policy.allow_list.is_empty() {
        let accounts = discovered
            .iter()
            .filter(|account| policy.allow_list.contains(&account.number))
            .cloned()
            .collect();
        return Selection {
            accounts,
            suffix_fallback: false,
        };
    }

    if let Some(suffix) = &policy.suffix {
        let matches: Vec<Account> = discovered
            .iter()
            .filter(|account| account.number.ends_with(suffix.as_str()))
            .cloned()
            .collect();
        if !matches.is_empty() {
            return Selection {
                accounts: matches,
                suffix_fallback: false,
            };
        }

        // Documented best-effort fallback; the caller reports it.
        return Selection {
            accounts: discovered.first().cloned().into_iter().collect(),
            suffix_fallback: true,
        };
    }

    Selection {
        accounts: discovered.to_vec(),
        suffix_fallback: false,
    }
}
