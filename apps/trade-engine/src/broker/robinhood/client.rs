//! Robinhood adapter: token session, market orders with limit fallback.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::http::{RetryPolicy, send_with_retry};
use crate::broker::{BrokerBackend, BrokerError, Capabilities, FallbackAxis};
use crate::config::Credential;
use crate::error::{AuthError, QuoteError};
use crate::models::{Account, AccountIdentity, OrderResponse, OrderTicket, Position, Quote, TicketType};
use crate::notify::Notifier;
use crate::session::{Challenge, TwoFactorResolver};

use super::api_types::{
    AccountRecord, InstrumentRecord, OrderPayload, OrderRecord, Paged, PositionRecord,
    QuoteRecord, TokenRequest, TokenResponse,
};

/// Public OAuth client id used by the web frontend.
const CLIENT_ID: &str = "c82SH0WZOsabOXGP2sxqcj34FxkvfnWRZBKlBjFS";

/// Token lifetime requested at login: 30 days.
const TOKEN_LIFETIME_SECS: u64 = 86_400 * 30;

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct RobinhoodConfig {
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for RobinhoodConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.robinhood.com".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl RobinhoodConfig {
    /// Override the base URL (tests point this at a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Authenticated token session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobinhoodSession {
    /// Bearer token.
    pub access_token: String,
    /// Expiry instant; revival fails past it.
    pub expires_at: DateTime<Utc>,
}

/// Robinhood brokerage adapter.
#[derive(Debug, Clone)]
pub struct RobinhoodClient {
    http: reqwest::Client,
    config: RobinhoodConfig,
}

impl RobinhoodClient {
    /// Create an adapter.
    pub fn new(config: RobinhoodConfig) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        session: &RobinhoodSession,
        path: &str,
    ) -> Result<T, BrokerError> {
        let url = self.url(path);
        let response = send_with_retry(&self.config.retry, || {
            self.http.get(&url).bearer_auth(&session.access_token)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::Api {
                code: status.as_u16().to_string(),
                message: body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))
    }

    async fn request_token(
        &self,
        credential: &Credential,
        mfa_code: Option<String>,
    ) -> Result<TokenResponse, AuthError> {
        let body = TokenRequest {
            username: credential.username.clone(),
            password: credential.secret.clone(),
            grant_type: "password".to_string(),
            client_id: CLIENT_ID.to_string(),
            scope: "internal".to_string(),
            expires_in: TOKEN_LIFETIME_SECS,
            mfa_code,
        };

        let url = self.url("/oauth2/token/");
        let response = send_with_retry(&self.config.retry, || self.http.post(&url).json(&body))
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))
    }

    fn submit_payload(ticket: &OrderTicket) -> OrderPayload {
        let (order_type, price) = match ticket.order_type {
            TicketType::Market => ("market", None),
            TicketType::Limit(price) => ("limit", Some(price)),
        };

        OrderPayload {
            account_number: ticket.account_ref.clone(),
            symbol: ticket.symbol.clone(),
            quantity: ticket.quantity,
            side: ticket.action.as_str().to_string(),
            order_type: order_type.to_string(),
            time_in_force: "gfd".to_string(),
            price,
        }
    }

    async fn place_order(
        &self,
        session: &RobinhoodSession,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        let payload = Self::submit_payload(ticket);
        let url = self.url("/orders/");

        tracing::info!(
            symbol = %ticket.symbol,
            side = %ticket.action,
            order_type = %payload.order_type,
            qty = %ticket.quantity,
            "submitting Robinhood order"
        );

        let response = send_with_retry(&self.config.retry, || {
            self.http
                .post(&url)
                .bearer_auth(&session.access_token)
                .json(&payload)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::SessionExpired);
        }

        let record = response
            .json::<OrderRecord>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))?;

        if status.is_success() && record.id.is_some() {
            return Ok(OrderResponse::accepted());
        }

        // 400-level bodies carry field-independent rejection messages; they
        // are a validation failure, not a transport error.
        let messages = record.messages();
        if messages.is_empty() {
            return Err(BrokerError::Api {
                code: status.as_u16().to_string(),
                message: "order submission returned no order id".to_string(),
            });
        }
        Ok(OrderResponse::refused(messages))
    }
}

#[async_trait]
impl BrokerBackend for RobinhoodClient {
    type Session = RobinhoodSession;

    fn name(&self) -> &'static str {
        "Robinhood"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fallback: FallbackAxis::LimitOrder,
            ..Capabilities::default()
        }
    }

    async fn restore_session(
        &self,
        artifact: serde_json::Value,
    ) -> Result<Self::Session, AuthError> {
        let session: RobinhoodSession = serde_json::from_value(artifact)
            .map_err(|e| AuthError::StaleSession(e.to_string()))?;
        if session.expires_at <= Utc::now() {
            return Err(AuthError::StaleSession("token expired".to_string()));
        }
        Ok(session)
    }

    async fn probe(&self, session: &Self::Session) -> bool {
        self.get_json::<Paged<AccountRecord>>(session, "/accounts/")
            .await
            .is_ok()
    }

    async fn login(
        &self,
        identity: &AccountIdentity,
        credential: &Credential,
        two_factor: &TwoFactorResolver,
        notifier: &dyn Notifier,
    ) -> Result<Self::Session, AuthError> {
        let mut response = self.request_token(credential, None).await?;

        if response.mfa_required == Some(true) {
            notifier.notify(&format!(
                "{identity}: check your phone for a verification prompt"
            ));
            let challenge = Challenge::CodeRequired {
                label: identity.label.clone(),
            };
            let code = two_factor
                .resolve(&challenge, credential, notifier)
                .await
                .map_err(|e| e.into_auth_error(&identity.label))?;
            response = self.request_token(credential, code).await?;
        }

        match response.access_token {
            Some(access_token) => {
                let lifetime = response.expires_in.unwrap_or(TOKEN_LIFETIME_SECS);
                let lifetime = i64::try_from(lifetime).unwrap_or(86_400 * 30);
                Ok(RobinhoodSession {
                    access_token,
                    expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
                })
            }
            None => Err(AuthError::LoginRejected {
                label: identity.label.clone(),
                reason: response
                    .detail
                    .unwrap_or_else(|| "no access token in response".to_string()),
            }),
        }
    }

    fn artifact(&self, session: &Self::Session) -> serde_json::Value {
        serde_json::to_value(session).unwrap_or(serde_json::Value::Null)
    }

    async fn logout(&self, session: Self::Session) {
        // Token revocation is best-effort; the artifact stays cached for
        // the next run.
        let url = self.url("/oauth2/revoke_token/");
        let _ = self
            .http
            .post(&url)
            .bearer_auth(&session.access_token)
            .form(&[("client_id", CLIENT_ID), ("token", &session.access_token)])
            .send()
            .await;
    }

    async fn accounts(&self, session: &Self::Session) -> Result<Vec<Account>, BrokerError> {
        let page: Paged<AccountRecord> = self.get_json(session, "/accounts/").await?;

        Ok(page
            .results
            .into_iter()
            .map(|record| {
                let cash = record
                    .portfolio_cash
                    .as_deref()
                    .and_then(|v| v.parse::<Decimal>().ok())
                    .unwrap_or_default();
                let mut account = Account::new(record.account_number, cash);
                if let Some(kind) = record.brokerage_account_type {
                    account = account.with_kind(kind);
                }
                account
            })
            .collect())
    }

    async fn positions(
        &self,
        session: &Self::Session,
        account: &Account,
    ) -> Result<Vec<Position>, BrokerError> {
        let path = format!(
            "/positions/?nonzero=true&account_number={}",
            account.number
        );
        let page: Paged<PositionRecord> = self.get_json(session, &path).await?;

        Ok(page
            .results
            .into_iter()
            .map(|record| Position {
                symbol: record.symbol,
                instrument_ref: record.instrument,
                quantity: record.quantity.parse().unwrap_or_default(),
                price: None,
            })
            .collect())
    }

    async fn resolve_symbol(
        &self,
        session: &Self::Session,
        position: &Position,
    ) -> Result<Option<String>, BrokerError> {
        let Some(instrument_url) = &position.instrument_ref else {
            return Ok(None);
        };

        let response = send_with_retry(&self.config.retry, || {
            self.http
                .get(instrument_url)
                .bearer_auth(&session.access_token)
        })
        .await?;

        if !response.status().is_success() {
            return Err(BrokerError::Api {
                code: response.status().as_u16().to_string(),
                message: "instrument lookup failed".to_string(),
            });
        }

        let record = response
            .json::<InstrumentRecord>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))?;
        Ok(record.symbol)
    }

    async fn quote(&self, session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError> {
        let path = format!("/quotes/{symbol}/");
        let record: QuoteRecord = self
            .get_json(session, &path)
            .await
            .map_err(|e| QuoteError::new(symbol, e.to_string()))?;

        let parse = |value: Option<&String>| value.and_then(|v| v.parse::<Decimal>().ok());
        Ok(Quote {
            bid: parse(record.bid_price.as_ref()),
            ask: parse(record.ask_price.as_ref()),
            last: parse(record.last_trade_price.as_ref()),
        })
    }

    async fn submit(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        self.place_order(session, ticket).await
    }

    async fn submit_fallback(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        // Same endpoint, limit-priced ticket built by the executor.
        self.place_order(session, ticket).await
    }
}
