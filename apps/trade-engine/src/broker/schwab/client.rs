//! Schwab adapter: dual API generations behind one token session.
//!
//! The account/position snapshot is fetched once per session and served
//! from a cache, matching the single account-info call the login flow
//! makes.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::broker::http::{RetryPolicy, send_with_retry};
use crate::broker::{BrokerBackend, BrokerError, Capabilities, FallbackAxis};
use crate::config::Credential;
use crate::error::{AuthError, QuoteError};
use crate::models::{Account, AccountIdentity, OrderResponse, OrderTicket, Position, Quote};
use crate::notify::Notifier;
use crate::session::{Challenge, TwoFactorResolver};

use super::api_types::{
    AccountInfoRecord, AccountInfoResponse, LoginRequest, LoginResponse, QuoteRecord,
    TradeRequest, TradeResponse,
};

/// Cached-session validity window.
const SESSION_VALIDITY_DAYS: i64 = 7;

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct SchwabConfig {
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for SchwabConfig {
    fn default() -> Self {
        Self {
            base_url: "https://client.schwab.com".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl SchwabConfig {
    /// Override the base URL (tests point this at a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Persisted token artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchwabArtifact {
    /// Bearer token.
    pub token: String,
    /// When the token was obtained.
    pub obtained_at: DateTime<Utc>,
}

/// Authenticated session with its lazily fetched snapshot.
#[derive(Debug)]
pub struct SchwabSession {
    token: String,
    obtained_at: DateTime<Utc>,
    snapshot: Mutex<Option<Vec<AccountInfoRecord>>>,
}

impl SchwabSession {
    fn new(token: String, obtained_at: DateTime<Utc>) -> Self {
        Self {
            token,
            obtained_at,
            snapshot: Mutex::new(None),
        }
    }
}

/// Schwab brokerage adapter.
#[derive(Debug, Clone)]
pub struct SchwabClient {
    http: reqwest::Client,
    config: SchwabConfig,
}

impl SchwabClient {
    /// Create an adapter.
    pub fn new(config: SchwabConfig) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Fetch the account snapshot, caching it on the session.
    async fn snapshot(&self, session: &SchwabSession) -> Result<Vec<AccountInfoRecord>, BrokerError> {
        let mut cache = session.snapshot.lock().await;
        if let Some(snapshot) = cache.as_ref() {
            return Ok(snapshot.clone());
        }

        let url = self.url("/api/accounts");
        let response = send_with_retry(&self.config.retry, || {
            self.http.get(&url).bearer_auth(&session.token)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::SessionExpired);
        }
        if !status.is_success() {
            return Err(BrokerError::Api {
                code: status.as_u16().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let info = response
            .json::<AccountInfoResponse>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))?;

        *cache = Some(info.accounts.clone());
        Ok(info.accounts)
    }

    fn trade_request(ticket: &OrderTicket) -> TradeRequest {
        // The trade endpoints capitalize the side word.
        let side = match ticket.action {
            crate::models::OrderAction::Buy => "Buy",
            crate::models::OrderAction::Sell => "Sell",
        };
        TradeRequest {
            ticker: ticket.symbol.clone(),
            side: side.to_string(),
            qty: ticket.quantity,
            account_id: ticket.account_ref.clone(),
        }
    }

    async fn trade(
        &self,
        session: &SchwabSession,
        ticket: &OrderTicket,
        path: &str,
    ) -> Result<OrderResponse, BrokerError> {
        let body = Self::trade_request(ticket);
        let url = self.url(path);

        tracing::info!(
            symbol = %ticket.symbol,
            side = %body.side,
            qty = %ticket.quantity,
            endpoint = path,
            "submitting Schwab order"
        );

        let response = send_with_retry(&self.config.retry, || {
            self.http
                .post(&url)
                .bearer_auth(&session.token)
                .json(&body)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::SessionExpired);
        }
        if !status.is_success() {
            return Err(BrokerError::Api {
                code: status.as_u16().to_string(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let verification = response
            .json::<TradeResponse>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))?;

        if verification.success {
            Ok(OrderResponse::accepted())
        } else {
            Ok(OrderResponse::refused(verification.messages))
        }
    }
}

#[async_trait]
impl BrokerBackend for SchwabClient {
    type Session = SchwabSession;

    fn name(&self) -> &'static str {
        "Schwab"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fallback: FallbackAxis::LegacyApi,
            ..Capabilities::default()
        }
    }

    async fn restore_session(
        &self,
        artifact: serde_json::Value,
    ) -> Result<Self::Session, AuthError> {
        let artifact: SchwabArtifact = serde_json::from_value(artifact)
            .map_err(|e| AuthError::StaleSession(e.to_string()))?;
        let age = Utc::now() - artifact.obtained_at;
        if age > chrono::Duration::days(SESSION_VALIDITY_DAYS) {
            return Err(AuthError::StaleSession("token past validity window".to_string()));
        }
        Ok(SchwabSession::new(artifact.token, artifact.obtained_at))
    }

    async fn probe(&self, session: &Self::Session) -> bool {
        self.snapshot(session).await.is_ok()
    }

    async fn login(
        &self,
        identity: &AccountIdentity,
        credential: &Credential,
        two_factor: &TwoFactorResolver,
        notifier: &dyn Notifier,
    ) -> Result<Self::Session, AuthError> {
        let challenge = Challenge::CodeRequired {
            label: identity.label.clone(),
        };

        // An enrolled authenticator derives its code up front; without a
        // seed the first attempt goes out bare and the relay only runs if
        // the backend asks for a code.
        let mut code = if credential.totp_seed.is_some() {
            two_factor
                .resolve(&challenge, credential, notifier)
                .await
                .map_err(|e| e.into_auth_error(&identity.label))?
        } else {
            None
        };

        let mut response = self.post_login(credential, code.clone()).await?;

        if response.token.is_none() && response.mfa_required == Some(true) {
            code = two_factor
                .resolve(&challenge, credential, notifier)
                .await
                .map_err(|e| e.into_auth_error(&identity.label))?;
            response = self.post_login(credential, code).await?;
        }

        match response.token {
            Some(token) => Ok(SchwabSession::new(token, Utc::now())),
            None => Err(AuthError::LoginRejected {
                label: identity.label.clone(),
                reason: response
                    .reason
                    .unwrap_or_else(|| "no session token in response".to_string()),
            }),
        }
    }

    fn artifact(&self, session: &Self::Session) -> serde_json::Value {
        serde_json::to_value(SchwabArtifact {
            token: session.token.clone(),
            obtained_at: session.obtained_at,
        })
        .unwrap_or(serde_json::Value::Null)
    }

    async fn logout(&self, session: Self::Session) {
        let url = self.url("/api/logout");
        let _ = self.http.post(&url).bearer_auth(&session.token).send().await;
    }

    async fn accounts(&self, session: &Self::Session) -> Result<Vec<Account>, BrokerError> {
        let snapshot = self.snapshot(session).await?;
        Ok(snapshot
            .into_iter()
            .map(|record| Account::new(record.account_id, record.account_value))
            .collect())
    }

    async fn positions(
        &self,
        session: &Self::Session,
        account: &Account,
    ) -> Result<Vec<Position>, BrokerError> {
        let snapshot = self.snapshot(session).await?;
        let Some(record) = snapshot.iter().find(|r| r.account_id == account.number) else {
            return Ok(Vec::new());
        };

        Ok(record
            .positions
            .iter()
            .map(|p| {
                // Per-share price is derived from market value; a zero
                // quantity cannot divide.
                let price = if p.quantity.is_zero() {
                    Decimal::ZERO
                } else {
                    (p.market_value / p.quantity).round_dp(2)
                };
                Position {
                    symbol: if p.symbol.is_empty() {
                        None
                    } else {
                        Some(p.symbol.clone())
                    },
                    instrument_ref: None,
                    quantity: p.quantity,
                    price: Some(price),
                }
            })
            .collect())
    }

    async fn quote(&self, session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError> {
        let url = self.url(&format!("/api/quote/{symbol}"));
        let response = send_with_retry(&self.config.retry, || {
            self.http.get(&url).bearer_auth(&session.token)
        })
        .await
        .map_err(|e| QuoteError::new(symbol, e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuoteError::new(
                symbol,
                format!("status {}", response.status().as_u16()),
            ));
        }

        let record = response
            .json::<QuoteRecord>()
            .await
            .map_err(|e| QuoteError::new(symbol, e.to_string()))?;
        Ok(Quote {
            bid: record.bid,
            ask: record.ask,
            last: record.last,
        })
    }

    async fn submit(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        self.trade(session, ticket, "/api/trade/v2").await
    }

    async fn submit_fallback(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        // Legacy API generation, identical parameters.
        self.trade(session, ticket, "/api/trade").await
    }
}

impl SchwabClient {
    async fn post_login(
        &self,
        credential: &Credential,
        totp_code: Option<String>,
    ) -> Result<LoginResponse, AuthError> {
        let body = LoginRequest {
            username: credential.username.clone(),
            password: credential.secret.clone(),
            totp_code,
        };

        let url = self.url("/api/login");
        let response = send_with_retry(&self.config.retry, || self.http.post(&url).json(&body))
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        response
            .json::<LoginResponse>()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))
    }
}
