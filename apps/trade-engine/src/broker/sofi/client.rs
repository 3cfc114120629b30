//! SoFi adapter: cookie session with CSRF token, dual endpoint generations.
//!
//! The original drives login through a browser; here the login primitive is
//! an HTTP collaborator behind the same contract, and the persisted session
//! artifact is the cookie set.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;

use crate::broker::http::{RetryPolicy, send_with_retry};
use crate::broker::{
    BrokerBackend, BrokerError, Capabilities, FallbackAxis, SalablePosition, fallback,
};
use crate::config::Credential;
use crate::error::{AuthError, QuoteError};
use crate::models::{
    Account, AccountIdentity, OrderAction, OrderResponse, OrderTicket, Position, Quote,
    TicketType,
};
use crate::notify::Notifier;
use crate::session::{Challenge, TwoFactorResolver};

use super::api_types::{
    AccountRecord, FractionalOrderPayload, FundedAccountRecord, HoldingsResponse, LoginRequest,
    LoginResponse, ORDER_PLACED_HEADER, OrderPayload, OrderPlacedResponse, QuoteRecord,
    SymbolHoldingsResponse, VerifyRequest,
};

/// Cookie names that carry the CSRF token, in lookup order.
const CSRF_COOKIE_NAMES: &[&str] = &["SOFI_CSRF_COOKIE", "SOFI_R_CSRF_TOKEN"];

/// Session-liveness probe endpoints, newest generation first.
const USER_ENDPOINTS: &[&str] = &[
    "/wealth/backend/api/v1/user",
    "/wealth/backend/api/v3/user",
    "/wealth/backend/api/v1/user/profile",
    "/wealth/backend/api/v3/user/profile",
];

/// Account-list endpoint generations, newest first.
const ACCOUNT_LIST_ENDPOINTS: &[&str] = &[
    "/wealth/backend/api/v3/account/list",
    "/wealth/backend/v1/json/accounts",
];

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct SofiConfig {
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
}

impl Default for SofiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.sofi.com".to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl SofiConfig {
    /// Override the base URL (tests point this at a local server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Authenticated cookie session.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct SofiSession {
    /// Cookie name → value.
    pub cookies: HashMap<String, String>,
}

impl SofiSession {
    /// CSRF token from the session cookies, when present.
    #[must_use]
    pub fn csrf_token(&self) -> Option<&str> {
        CSRF_COOKIE_NAMES
            .iter()
            .find_map(|name| self.cookies.get(*name).map(String::as_str))
    }

    fn cookie_header(&self) -> String {
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }

    /// Merge cookies from a response into the session.
    fn absorb_cookies(&mut self, headers: &HeaderMap) {
        for value in headers.get_all(SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let Some(pair) = raw.split(';').next() else {
                continue;
            };
            if let Some((name, value)) = pair.split_once('=') {
                self.cookies
                    .insert(name.trim().to_string(), value.trim().to_string());
            }
        }
    }
}

/// SoFi brokerage adapter.
#[derive(Debug, Clone)]
pub struct SofiClient {
    http: reqwest::Client,
    config: SofiConfig,
}

impl SofiClient {
    /// Create an adapter.
    pub fn new(config: SofiConfig) -> Result<Self, BrokerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BrokerError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn headers(&self, session: &SofiSession, with_csrf: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            "x-requested-with",
            HeaderValue::from_static("XMLHttpRequest"),
        );
        if let Ok(cookie) = HeaderValue::from_str(&session.cookie_header()) {
            headers.insert("cookie", cookie);
        }
        if with_csrf
            && let Some(token) = session.csrf_token()
            && let Ok(value) = HeaderValue::from_str(token)
        {
            headers.insert("csrf-token", value);
            if let Ok(origin) = HeaderValue::from_str(&self.config.base_url) {
                headers.insert("origin", origin);
            }
        }
        headers
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        session: &SofiSession,
        path: &str,
    ) -> Result<T, BrokerError> {
        let url = self.url(path);
        let headers = self.headers(session, false);
        let response = send_with_retry(&self.config.retry, || {
            self.http.get(&url).headers(headers.clone())
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

        response
            .json::<T>()
            .await
            .map_err(|e| BrokerError::Transport(e.to_string()))
    }

    async fn account_list(&self, session: &SofiSession) -> Result<Vec<AccountRecord>, BrokerError> {
        // New API first, old endpoint when it fails.
        let result = fallback::first_match(ACCOUNT_LIST_ENDPOINTS, Duration::ZERO, |path| {
            self.get_json::<Vec<AccountRecord>>(session, *path)
        })
        .await;

        result.map_err(|mut errors| {
            errors.pop().unwrap_or_else(|| {
                BrokerError::Transport("no account endpoint succeeded".to_string())
            })
        })
    }

    async fn quote_record(&self, session: &SofiSession, symbol: &str) -> Result<QuoteRecord, BrokerError> {
        let path =
            format!("/wealth/backend/api/v1/tearsheet/quote?symbol={symbol}&productSubtype=BROKERAGE");
        self.get_json(session, &path).await
    }

    async fn post_order<B: serde::Serialize>(
        &self,
        session: &SofiSession,
        path: &str,
        body: &B,
    ) -> Result<OrderResponse, BrokerError> {
        let url = self.url(path);
        let headers = self.headers(session, true);
        let response = send_with_retry(&self.config.retry, || {
            self.http.post(&url).headers(headers.clone()).json(body)
        })
        .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BrokerError::SessionExpired);
        }

        if status.is_success() {
            let placed = response
                .json::<OrderPlacedResponse>()
                .await
                .map_err(|e| BrokerError::Transport(e.to_string()))?;
            return match placed.header {
                Some(header) if header == ORDER_PLACED_HEADER => Ok(OrderResponse::accepted()),
                Some(header) => Ok(OrderResponse::refused(vec![header])),
                None => Ok(OrderResponse::refused(vec![
                    "order response had no result header".to_string(),
                ])),
            };
        }

        let body_text = response.text().await.unwrap_or_default();
        if body_text.to_lowercase().contains("cannot be traded") {
            // Policy refusal, not a transport problem; the known-error
            // table turns this into a user-facing explanation.
            return Ok(OrderResponse::refused(vec![body_text]));
        }
        Err(BrokerError::Api {
            code: status.as_u16().to_string(),
            message: body_text,
        })
    }

    async fn per_account_salable(
        &self,
        session: &SofiSession,
        symbol: &str,
    ) -> Result<Vec<SalablePosition>, BrokerError> {
        let accounts = self.account_list(session).await?;
        let mut found = Vec::new();

        for account in accounts {
            let path = format!(
                "/wealth/backend/api/v3/account/{}/holdings?accountDataType=INTERNAL",
                account.id
            );
            let holdings: HoldingsResponse = match self.get_json(session, &path).await {
                Ok(holdings) => holdings,
                Err(e) => {
                    tracing::warn!(account = %account.id, error = %e, "holdings scan failed for account");
                    continue;
                }
            };

            for row in holdings.holdings {
                let matches = row
                    .symbol
                    .as_deref()
                    .is_some_and(|s| s.eq_ignore_ascii_case(symbol));
                let salable = row.salable_quantity.unwrap_or_default();
                if matches && salable > Decimal::ZERO {
                    found.push(SalablePosition {
                        account_ref: account.id.clone(),
                        quantity: salable,
                    });
                }
            }
        }

        Ok(found)
    }
}

#[async_trait]
impl BrokerBackend for SofiClient {
    type Session = SofiSession;

    fn name(&self) -> &'static str {
        "SoFi"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fallback: FallbackAxis::None,
            quote_priced_entry: true,
            buying_power_gate: true,
            verify_holdings_before_sell: true,
            sell_first_success: true,
        }
    }

    async fn restore_session(
        &self,
        artifact: serde_json::Value,
    ) -> Result<Self::Session, AuthError> {
        let session: SofiSession = serde_json::from_value(artifact)
            .map_err(|e| AuthError::StaleSession(e.to_string()))?;
        if session.cookies.is_empty() {
            return Err(AuthError::StaleSession("no cookies in artifact".to_string()));
        }
        Ok(session)
    }

    async fn probe(&self, session: &Self::Session) -> bool {
        // Any user endpoint generation answering means the session lives.
        fallback::first_match(USER_ENDPOINTS, Duration::ZERO, |path| {
            self.get_json::<serde_json::Value>(session, *path)
        })
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
        let mut session = SofiSession::default();

        let body = LoginRequest {
            email: credential.username.clone(),
            password: credential.secret.clone(),
        };
        let url = self.url("/api/auth/login");
        let response = send_with_retry(&self.config.retry, || self.http.post(&url).json(&body))
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        session.absorb_cookies(response.headers());
        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        if let Some(error) = login.error {
            return Err(AuthError::LoginRejected {
                label: identity.label.clone(),
                reason: error,
            });
        }

        if login.mfa_required == Some(true) {
            if login.delivery.as_deref() == Some("SMS") {
                notifier.notify(&format!("{identity}: a text message code was sent"));
            }
            let challenge = Challenge::CodeRequired {
                label: identity.label.clone(),
            };
            let code = two_factor
                .resolve(&challenge, credential, notifier)
                .await
                .map_err(|e| e.into_auth_error(&identity.label))?
                .ok_or_else(|| AuthError::LoginRejected {
                    label: identity.label.clone(),
                    reason: "challenge pending but no code resolved".to_string(),
                })?;

            let verify = VerifyRequest {
                code,
                remember_browser: true,
            };
            let verify_url = self.url("/api/auth/verify");
            let verify_headers = self.headers(&session, true);
            let response = send_with_retry(&self.config.retry, || {
                self.http
                    .post(&verify_url)
                    .headers(verify_headers.clone())
                    .json(&verify)
            })
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

            if !response.status().is_success() {
                return Err(AuthError::LoginRejected {
                    label: identity.label.clone(),
                    reason: format!("challenge verification failed ({})", response.status()),
                });
            }
            session.absorb_cookies(response.headers());
        }

        if !self.probe(&session).await {
            return Err(AuthError::LoginRejected {
                label: identity.label.clone(),
                reason: "session failed liveness check after login".to_string(),
            });
        }

        Ok(session)
    }

    fn artifact(&self, session: &Self::Session) -> serde_json::Value {
        serde_json::to_value(session).unwrap_or(serde_json::Value::Null)
    }

    async fn logout(&self, _session: Self::Session) {
        // Cookies stay valid on purpose; the persisted artifact is the
        // next run's cache-first path.
        tracing::debug!("releasing SoFi session");
    }

    async fn accounts(&self, session: &Self::Session) -> Result<Vec<Account>, BrokerError> {
        let records = self.account_list(session).await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let mut account =
                    Account::new(record.apex_account_id, record.total_equity_value)
                        .with_internal_ref(record.id);
                if let Some(description) = record.kind.and_then(|k| k.description) {
                    account = account.with_kind(description);
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
            "/wealth/backend/api/v3/account/{}/holdings?accountDataType=INTERNAL",
            account.backend_ref()
        );
        let response: HoldingsResponse = self.get_json(session, &path).await?;

        Ok(response
            .holdings
            .into_iter()
            .map(|row| Position {
                symbol: row.symbol,
                instrument_ref: None,
                quantity: row.shares.unwrap_or_default(),
                price: row.price,
            })
            .collect())
    }

    async fn quote(&self, session: &Self::Session, symbol: &str) -> Result<Quote, QuoteError> {
        let record = self
            .quote_record(session, symbol)
            .await
            .map_err(|e| QuoteError::new(symbol, e.to_string()))?;

        Ok(Quote {
            bid: None,
            ask: None,
            last: record.price.map(|p| p.round_dp(2)),
        })
    }

    async fn submit(
        &self,
        session: &Self::Session,
        ticket: &OrderTicket,
    ) -> Result<OrderResponse, BrokerError> {
        let operation = match ticket.action {
            OrderAction::Buy => "BUY",
            OrderAction::Sell => "SELL",
        };

        if ticket.quantity < Decimal::ONE {
            // Fractional shares go out cash-amount-based at market.
            let price = self
                .quote_record(session, &ticket.symbol)
                .await?
                .price
                .ok_or_else(|| BrokerError::Api {
                    code: "quote".to_string(),
                    message: format!("no price available for {}", ticket.symbol),
                })?;
            let cash_amount = (price * ticket.quantity).round_dp(2);

            let payload = FractionalOrderPayload {
                operation: operation.to_string(),
                cash_amount,
                quantity: ticket.quantity,
                symbol: ticket.symbol.clone(),
                account_id: ticket.account_ref.clone(),
                time: "DAY".to_string(),
                order_type: "MARKET".to_string(),
                trading_session: "CORE_HOURS".to_string(),
                sell_all: false,
            };
            return self
                .post_order(
                    session,
                    "/wealth/backend/api/v1/trade/order-fractional",
                    &payload,
                )
                .await;
        }

        let TicketType::Limit(limit_price) = ticket.order_type else {
            return Err(BrokerError::Unsupported);
        };

        let payload = OrderPayload {
            operation: operation.to_string(),
            quantity: ticket.quantity.to_string(),
            time: "DAY".to_string(),
            order_type: "LIMIT".to_string(),
            limit_price,
            symbol: ticket.symbol.clone(),
            account_id: ticket.account_ref.clone(),
            trading_session: "CORE_HOURS".to_string(),
        };

        tracing::info!(
            symbol = %ticket.symbol,
            operation,
            qty = %ticket.quantity,
            limit_price = %limit_price,
            "submitting SoFi order"
        );
        self.post_order(session, "/wealth/backend/api/v1/trade/order", &payload)
            .await
    }

    async fn buying_power(
        &self,
        session: &Self::Session,
        account: &Account,
    ) -> Result<Option<Decimal>, BrokerError> {
        let funded: Vec<FundedAccountRecord> = self
            .get_json(session, "/wealth/backend/api/v1/user/funded-brokerage-accounts")
            .await?;

        Ok(funded
            .iter()
            .find(|record| record.account_id == account.backend_ref())
            .map(|record| record.account_buying_power))
    }

    async fn salable_positions(
        &self,
        session: &Self::Session,
        symbol: &str,
    ) -> Result<Vec<SalablePosition>, BrokerError> {
        // Customer-level endpoint first; scan account by account when it
        // returns nothing.
        let path = format!("/wealth/backend/api/v3/customer/holdings/symbol/{symbol}");
        let infos = match self.get_json::<SymbolHoldingsResponse>(session, &path).await {
            Ok(response) => response.account_holding_infos,
            Err(e) => {
                tracing::info!(symbol, error = %e, "customer holdings endpoint failed, scanning accounts");
                Vec::new()
            }
        };

        if !infos.is_empty() {
            return Ok(infos
                .into_iter()
                .filter(|info| info.salable_quantity > Decimal::ZERO)
                .map(|info| SalablePosition {
                    account_ref: info.account_id,
                    quantity: info.salable_quantity,
                })
                .collect());
        }

        self.per_account_salable(session, symbol).await
    }
}
