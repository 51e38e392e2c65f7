//! Currency conversion and the anonymous page cache.

use axum::http::{Method, StatusCode, header};
use emporium_core::{CurrencyCode, Role};
use emporium_integration_tests::{TestApp, request, token};
use rust_decimal::Decimal;

const CONVERT: &str = "/api/currencies/convert?amount=10&from=USD&to=EUR";

async fn app_with_eur_rate() -> TestApp {
    let app = TestApp::new();
    app.state
        .currency()
        .remember(CurrencyCode::EUR, Decimal::new(9, 1))
        .await;
    app
}

fn decimal(value: &serde_json::Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {value}"))
}

#[tokio::test]
async fn test_convert_uses_known_rate() {
    let app = app_with_eur_rate().await;
    let response = app.get(CONVERT).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["to"], "EUR");
    assert_eq!(decimal(&body["result"]["amount"]), Decimal::new(9, 0));
    assert_eq!(body["result"]["currency"], "EUR");
}

#[tokio::test]
async fn test_convert_through_base_currency() {
    let app = app_with_eur_rate().await;
    let response = app
        .get("/api/currencies/convert?amount=9&from=EUR&to=USD")
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(decimal(&response.json()["result"]["amount"]), Decimal::new(10, 0));
}

#[tokio::test]
async fn test_anonymous_reads_are_cached() {
    let app = app_with_eur_rate().await;

    let first = app.get(CONVERT).await;
    assert_eq!(first.header("x-cache"), Some("miss"));

    let second = app.get(CONVERT).await;
    assert_eq!(second.header("x-cache"), Some("hit"));
    assert_eq!(first.body, second.body);
}

#[tokio::test]
async fn test_cache_key_includes_language() {
    let app = app_with_eur_rate().await;
    app.get(CONVERT).await;

    let mut req = request(Method::GET, CONVERT, None, None);
    req.headers_mut().insert(
        header::ACCEPT_LANGUAGE,
        "de-DE,de;q=0.9".parse().unwrap_or_else(|_| unreachable!()),
    );
    let german = app.send(req).await;
    assert_eq!(german.header("x-cache"), Some("miss"));

    let english = app.get(CONVERT).await;
    assert_eq!(english.header("x-cache"), Some("hit"));
}

#[tokio::test]
async fn test_authenticated_reads_bypass_cache() {
    let app = app_with_eur_rate().await;
    app.get(CONVERT).await;

    let response = app.get_as(CONVERT, &token(Role::Viewer)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("x-cache"), None);
}

#[tokio::test]
async fn test_cleared_cache_misses_again() {
    let app = app_with_eur_rate().await;
    app.get(CONVERT).await;
    app.state.page_cache().clear();

    let response = app.get(CONVERT).await;
    assert_eq!(response.header("x-cache"), Some("miss"));
}

#[tokio::test]
async fn test_convert_out_of_range_amount_is_field_error() {
    let app = TestApp::new();
    app.state
        .currency()
        .remember(CurrencyCode::JPY, Decimal::new(150, 0))
        .await;
    let response = app
        .get("/api/currencies/convert?amount=1000000000000000000000000000&from=USD&to=JPY")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(body["errors"]["amount"].is_array(), "{body}");
}
