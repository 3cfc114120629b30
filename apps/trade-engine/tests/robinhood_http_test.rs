//! Robinhood adapter wire-level tests against a mock HTTP server.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trade_engine::broker::robinhood::{RobinhoodClient, RobinhoodConfig, RobinhoodSession};
use trade_engine::models::{OrderAction, OrderTicket, TicketType};
use trade_engine::{
    AccountIdentity, BrokerBackend, Credential, MemoryNotifier, TwoFactorResolver,
};

fn client_for(server: &MockServer) -> RobinhoodClient {
    RobinhoodClient::new(RobinhoodConfig::default().with_base_url(server.uri())).unwrap()
}

fn session() -> RobinhoodSession {
    RobinhoodSession {
        access_token: "tok".to_string(),
        expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
    }
}

#[tokio::test]
async fn plain_login_yields_a_token_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh-token",
            "expires_in": 3600
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let session = client
        .login(
            &AccountIdentity::new("Robinhood", 1),
            &Credential::new("user", "pass"),
            &TwoFactorResolver::new(),
            &MemoryNotifier::new(),
        )
        .await
        .unwrap();

    assert_eq!(session.access_token, "fresh-token");
    assert!(session.expires_at > chrono::Utc::now());
}

#[tokio::test]
async fn challenged_login_retries_with_the_relayed_code() {
    let server = MockServer::start().await;

    // The code-bearing retry must win over the generic mock, so it is
    // mounted first.
    Mock::given(method("POST"))
        .and(path("/oauth2/token/"))
        .and(body_partial_json(serde_json::json!({"mfa_code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "challenged-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth2/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "mfa_required": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let notifier = MemoryNotifier::new();
    notifier.push_code("123456");

    let client = client_for(&server);
    let session = client
        .login(
            &AccountIdentity::new("Robinhood", 1),
            &Credential::new("user", "pass"),
            &TwoFactorResolver::new(),
            &notifier,
        )
        .await
        .unwrap();

    assert_eq!(session.access_token, "challenged-token");
    assert!(notifier.saw("verification prompt"));
}

#[tokio::test]
async fn rejected_login_surfaces_the_backend_detail() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "detail": "Unable to log in with provided credentials."
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client
        .login(
            &AccountIdentity::new("Robinhood", 1),
            &Credential::new("user", "wrong"),
            &TwoFactorResolver::new(),
            &MemoryNotifier::new(),
        )
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Unable to log in"));
}

#[tokio::test]
async fn quote_parses_string_prices() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/quotes/XYZ/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "bid_price": "10.000000",
            "ask_price": "10.050000",
            "last_trade_price": "10.020000"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let quote = client.quote(&session(), "XYZ").await.unwrap();

    assert_eq!(quote.bid, Some(dec!(10.00)));
    assert_eq!(quote.ask, Some(dec!(10.05)));
    assert_eq!(quote.last, Some(dec!(10.02)));
}

#[tokio::test]
async fn accounts_parse_type_and_cash() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/accounts/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {
                    "account_number": "5PY11111",
                    "brokerage_account_type": "individual",
                    "portfolio_cash": "120.5000"
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let accounts = client.accounts(&session()).await.unwrap();

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].number, "5PY11111");
    assert_eq!(accounts[0].kind.as_deref(), Some("individual"));
    assert_eq!(accounts[0].value, dec!(120.50));
}

#[tokio::test]
async fn rejected_order_is_a_refusal_with_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "non_field_errors": ["Not enough buying power."]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ticket = OrderTicket {
        symbol: "XYZ".to_string(),
        quantity: dec!(1),
        action: OrderAction::Buy,
        account_ref: "5PY11111".to_string(),
        order_type: TicketType::Market,
    };

    let response = client.submit(&session(), &ticket).await.unwrap();
    assert!(!response.succeeded);
    assert_eq!(response.messages, vec!["Not enough buying power."]);
}

#[tokio::test]
async fn accepted_order_carries_no_messages() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/orders/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "id": "order-1"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ticket = OrderTicket {
        symbol: "XYZ".to_string(),
        quantity: dec!(1),
        action: OrderAction::Buy,
        account_ref: "5PY11111".to_string(),
        order_type: TicketType::Market,
    };

    let response = client.submit(&session(), &ticket).await.unwrap();
    assert!(response.succeeded);
    assert!(response.messages.is_empty());
}
