//! SoFi adapter wire-level tests against a mock HTTP server.

// Allow unwrap in tests - tests should panic on unexpected errors
#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;
use wiremock::matchers::{body_partial_json, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trade_engine::broker::sofi::{SofiClient, SofiConfig, SofiSession};
use trade_engine::models::{OrderAction, OrderTicket, TicketType};
use trade_engine::{BrokerBackend, SalablePosition};

fn client_for(server: &MockServer) -> SofiClient {
    SofiClient::new(SofiConfig::default().with_base_url(server.uri())).unwrap()
}

fn session() -> SofiSession {
    SofiSession {
        cookies: [
            ("SOFI_CSRF_COOKIE".to_string(), "csrf-tok".to_string()),
            ("sid".to_string(), "abc".to_string()),
        ]
        .into_iter()
        .collect(),
    }
}

#[tokio::test]
async fn account_list_falls_back_to_the_old_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v3/account/list"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wealth/backend/v1/json/accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "apexAccountId": "2KB55555",
                "id": "1017",
                "type": {"description": "Individual"},
                "totalEquityValue": 512.34
            }
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let accounts = client.accounts(&session()).await.unwrap();

    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].number, "2KB55555");
    assert_eq!(accounts[0].backend_ref(), "1017");
    assert_eq!(accounts[0].value, dec!(512.34));
}

#[tokio::test]
async fn probe_tries_user_endpoint_generations_in_order() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v1/user"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v3/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(client.probe(&session()).await);
}

#[tokio::test]
async fn probe_fails_when_every_generation_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert!(!client.probe(&session()).await);
}

#[tokio::test]
async fn whole_share_order_goes_out_as_a_csrf_signed_limit_order() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wealth/backend/api/v1/trade/order"))
        .and(header_exists("csrf-token"))
        .and(body_partial_json(serde_json::json!({
            "operation": "BUY",
            "type": "LIMIT",
            "limitPrice": 10.06,
            "symbol": "XYZ",
            "accountId": "1017",
            "tradingSession": "CORE_HOURS"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "header": "Your order is placed."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ticket = OrderTicket {
        symbol: "XYZ".to_string(),
        quantity: dec!(2),
        action: OrderAction::Buy,
        account_ref: "1017".to_string(),
        order_type: TicketType::Limit(dec!(10.06)),
    };

    let response = client.submit(&session(), &ticket).await.unwrap();
    assert!(response.succeeded);
}

#[tokio::test]
async fn fractional_order_uses_the_cash_amount_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v1/tearsheet/quote"))
        .and(query_param("symbol", "XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "price": 10.50
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/wealth/backend/api/v1/trade/order-fractional"))
        .and(body_partial_json(serde_json::json!({
            "operation": "SELL",
            "type": "MARKET",
            "cashAmount": 5.25,
            "quantity": 0.5,
            "sellAll": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "header": "Your order is placed."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ticket = OrderTicket {
        symbol: "XYZ".to_string(),
        quantity: dec!(0.5),
        action: OrderAction::Sell,
        account_ref: "1017".to_string(),
        order_type: TicketType::Limit(dec!(10.49)),
    };

    let response = client.submit(&session(), &ticket).await.unwrap();
    assert!(response.succeeded);
}

#[tokio::test]
async fn untradeable_security_is_a_refusal_not_a_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/wealth/backend/api/v1/trade/order"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string("XYZ cannot be traded in this account"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let ticket = OrderTicket {
        symbol: "XYZ".to_string(),
        quantity: dec!(1),
        action: OrderAction::Buy,
        account_ref: "1017".to_string(),
        order_type: TicketType::Limit(dec!(10.00)),
    };

    let response = client.submit(&session(), &ticket).await.unwrap();
    assert!(!response.succeeded);
    assert!(response.messages[0].contains("cannot be traded"));
}

#[tokio::test]
async fn salable_lookup_scans_accounts_when_the_customer_endpoint_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v3/customer/holdings/symbol/XYZ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accountHoldingInfos": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v3/account/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"apexAccountId": "2KB55555", "id": "1017", "totalEquityValue": 100.0}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v3/account/1017/holdings"))
        .and(query_param("accountDataType", "INTERNAL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "holdings": [
                {"symbol": "xyz", "shares": 4.0, "price": 10.0, "salableQuantity": 3.0},
                {"symbol": "|CASH|", "shares": 100.0, "price": 1.0}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let salable = client.salable_positions(&session(), "XYZ").await.unwrap();

    assert_eq!(
        salable,
        vec![SalablePosition {
            account_ref: "1017".to_string(),
            quantity: dec!(3.0),
        }]
    );
}

#[tokio::test]
async fn buying_power_matches_the_internal_account_reference() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/wealth/backend/api/v1/user/funded-brokerage-accounts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"accountId": "1017", "accountBuyingPower": 250.75, "accountType": "Individual"},
            {"accountId": "2020", "accountBuyingPower": 10.00, "accountType": "Roth IRA"}
        ])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let account = trade_engine::Account::new("2KB55555", dec!(0)).with_internal_ref("1017");

    let buying_power = client.buying_power(&session(), &account).await.unwrap();
    assert_eq!(buying_power, Some(dec!(250.75)));
}
