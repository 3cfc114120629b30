//! Per-identity account registry.
//!
//! One registry per brokerage identity aggregates the discovered accounts,
//! their holdings, and the owned session handle. Account registration is
//! idempotent by account number because some backends return overlapping
//! account lists from different endpoints.

use std::collections::BTreeMap;

use crate::models::{Account, AccountIdentity, Holding};

/// Aggregate for one brokerage identity.
#[derive(Debug)]
pub struct BrokerageRegistry<S> {
    identity: AccountIdentity,
    session: Option<S>,
    accounts: Vec<Account>,
    holdings: BTreeMap<String, Vec<Holding>>,
}

impl<S> BrokerageRegistry<S> {
    /// Create an empty registry for an identity.
    #[must_use]
    pub fn new(identity: AccountIdentity) -> Self {
        Self {
            identity,
            session: None,
            accounts: Vec::new(),
            holdings: BTreeMap::new(),
        }
    }

    /// The identity this registry belongs to.
    #[must_use]
    pub const fn identity(&self) -> &AccountIdentity {
        &self.identity
    }

    /// Store the session handle. The registry owns it until
    /// [`Self::take_session`].
    pub fn set_session(&mut self, session: S) {
        self.session = Some(session);
    }

    /// Borrow the session handle.
    #[must_use]
    pub const fn session(&self) -> Option<&S> {
        self.session.as_ref()
    }

    /// Take the session handle for release.
    pub const fn take_session(&mut self) -> Option<S> {
        self.session.take()
    }

    /// Register a discovered account.
    ///
    /// A number already present for this identity is a no-op, never a
    /// duplicate entry.
    pub fn register_account(&mut self, account: Account) {
        if self.accounts.iter().any(|a| a.number == account.number) {
            return;
        }
        self.accounts.push(account);
    }

    /// Discovered accounts in registration order.
    #[must_use]
    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Record a holding for `(account_number, symbol)`, replacing any
    /// previous record under the same key.
    pub fn record_holding(&mut self, account_number: &str, holding: Holding) {
        let entry = self.holdings.entry(account_number.to_string()).or_default();
        if let Some(existing) = entry.iter_mut().find(|h| h.symbol == holding.symbol) {
            *existing = holding;
        } else {
            entry.push(holding);
        }
    }

    /// Holdings recorded for one account, in insertion order.
    #[must_use]
    pub fn holdings_of(&self, account_number: &str) -> &[Holding] {
        self.holdings
            .get(account_number)
            .map_or(&[], Vec::as_slice)
    }

    /// Drop all account and holding records, keeping the session.
    ///
    /// Holdings passes rebuild from scratch; there is no incremental merge
    /// across runs.
    pub fn clear_records(&mut self) {
        self.accounts.clear();
        self.holdings.clear();
    }
}
