//! Health checks and the middleware stack around every response.

use axum::http::{Method, StatusCode};
use emporium_integration_tests::{TestApp, request};

#[tokio::test]
async fn test_liveness_is_ok() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.as_ref(), b"ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let app = TestApp::new();
    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_request_id_is_generated() {
    let app = TestApp::new();
    let response = app.get("/health").await;
    let id = response.header("x-request-id").unwrap_or_default();
    assert!(!id.is_empty());
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = TestApp::new();
    let mut req = request(Method::GET, "/health", None, None);
    req.headers_mut()
        .insert("x-request-id", "smoke-1234".parse().unwrap_or_else(|_| unreachable!()));
    let response = app.send(req).await;
    assert_eq!(response.header("x-request-id"), Some("smoke-1234"));
}

#[tokio::test]
async fn test_nosniff_header_on_every_response() {
    let app = TestApp::new();
    for uri in ["/health", "/api/products/not-a-number"] {
        let response = app.get(uri).await;
        assert_eq!(response.header("x-content-type-options"), Some("nosniff"), "{uri}");
    }
}

#[tokio::test]
async fn test_cors_exposes_request_id() {
    let app = TestApp::new();
    let mut req = request(Method::GET, "/health", None, None);
    req.headers_mut().insert(
        "origin",
        "https://shop.example.com".parse().unwrap_or_else(|_| unreachable!()),
    );
    let response = app.send(req).await;
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    let exposed = response
        .header("access-control-expose-headers")
        .unwrap_or_default()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-request-id"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = TestApp::new();
    let response = app.get("/api/no-such-thing").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
