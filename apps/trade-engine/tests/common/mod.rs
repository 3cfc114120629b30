//! Scripted broker backend shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;

use trade_engine::{
    Account, AccountIdentity, AuthError, BrokerBackend, BrokerError, Capabilities, Credential,
    Notifier, OrderResponse, OrderTicket, Position, Quote, QuoteError, SalablePosition,
    TwoFactorResolver,
};

/// Session handle handed out by the scripted broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedSession(pub String);

/// Fully scripted backend: every answer is seeded by the test.
#[derive(Default)]
pub struct ScriptedBroker {
    pub caps: Capabilities,
    pub accounts: Vec<Account>,
    pub quotes: HashMap<String, Quote>,
    pub salable: Vec<SalablePosition>,
    pub buying_power: HashMap<String, Decimal>,
    pub positions: Vec<Position>,
    pub primary_responses: Mutex<VecDeque<Result<OrderResponse, BrokerError>>>,
    pub fallback_responses: Mutex<VecDeque<Result<OrderResponse, BrokerError>>>,
    pub primary_calls: Mutex<Vec<OrderTicket>>,
    pub fallback_calls: Mutex<Vec<OrderTicket>>,
    pub login_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
}

impl ScriptedBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_accounts(mut self, accounts: Vec<Account>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn with_quote(mut self, symbol: &str, quote: Quote) -> Self {
        self.quotes.insert(symbol.to_string(), quote);
        self
    }

    pub fn with_salable(mut self, salable: Vec<SalablePosition>) -> Self {
        self.salable = salable;
        self
    }

    pub fn with_buying_power(mut self, account_ref: &str, amount: Decimal) -> Self {
        self.buying_power.insert(account_ref.to_string(), amount);
        self
    }

    /// Queue a primary-submission response; an empty queue answers
    /// "accepted".
    pub fn queue_primary(&self, response: Result<OrderResponse, BrokerError>) {
        self.primary_responses.lock().unwrap().push_back(response);
    }

    /// Queue a fallback-submission response.
    pub fn queue_fallback(&self, response: Result<OrderResponse, BrokerError>) {
        self.fallback_responses.lock().unwrap().push_back(response);
    }

    pub fn primary_tickets(&self) -> Vec<OrderTicket> {
        self.primary_calls.lock().unwrap().clone()
    }

    pub fn fallback_tickets(&self) -> Vec<OrderTicket> {
        self.fallback_calls.lock().unwrap().clone()
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerBackend for ScriptedBroker {
    type Session = ScriptedSession;

    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    async fn restore_session(
        &self,
        artifact: serde_json::Value,
    ) -> Result<Self::Session, AuthError> {
        match artifact.as_str() {
            Some("cached") => Ok(ScriptedSession("cached".to_string())),
            _ => Err(AuthError::StaleSession("unknown artifact".to_string())),
        }
    }

    async fn probe(&self, _session: &Self::Session) -> bool {
        true
    }

    async fn login(
        &self,
        identity: &AccountIdentity,
        credential: &Credential,
        _two_factor: &TwoFactorResolver,
        _notifier: &dyn Notifier,
    ) -> Result<Self::Session, AuthError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        if credential.secret == "fail" {
            return Err(AuthError::LoginRejected {
                label: identity.label.clone(),
                reason: "scripted rejection".to_string(),
            });
        }
        Ok(ScriptedSession("fresh".to_string()))
    }

    fn artifact(&self, _session: &Self::Session) -> serde_json::Value {
        serde_json::Value::String("cached".to_string())
    }

    async fn logout(&self, _session: Self::Session) {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn accounts(&self, _session: &Self::Session) -> Result<Vec<Account>, BrokerError> {
        Ok(self.accounts.clone())
    }

    async fn positions(
        &self,
        _session: &Self::Session,
        _account: &Account,
    ) -> Result<Vec<Position>, BrokerError> {
        Ok(self.positions.clone())
    }

    async fn quote(&self, _session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError> {
        self.quotes
            .get(symbol)
            .copied()
            .ok_or_else(|| QuoteError::new(symbol, "no scripted quote"))
    }

    async fn submit(
        &self,
        _session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        self.primary_calls.lock().unwrap().push(ticket.clone());
        self.primary_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(OrderResponse::accepted()))
    }

    async fn submit_fallback(
        &self,
        _session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        self.fallback_calls.lock().unwrap().push(ticket.clone());
        self.fallback_responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(OrderResponse::accepted()))
    }

    async fn buying_power(
        &self,
        _session: &Self::Session,
        account: &Account,
    ) -> Result<Option<Decimal>, BrokerError> {
        Ok(self.buying_power.get(account.backend_ref()).copied())
    }

    async fn salable_positions(
        &self,
        _session: &Self::Session,
        _symbol: &str,
    ) -> Result<Vec<SalablePosition>, BrokerError> {
        Ok(self.salable.clone())
    }
}
