//! Authentication and permission checks, which run before any query.

use axum::http::{Method, StatusCode, header};
use chrono::{Duration, Utc};
use emporium_api::services::auth::TokenSigner;
use emporium_core::Role;
use emporium_integration_tests::{TEST_SECRET, TestApp, request, token};
use secrecy::SecretString;
use serde_json::json;

#[tokio::test]
async fn test_write_without_token_is_401() {
    let app = TestApp::new();
    let response = app
        .post_json("/api/categories", None, &json!({ "name": "Shirts" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(response.json()["detail"].is_string());
}

#[tokio::test]
async fn test_malformed_authorization_is_401() {
    let app = TestApp::new();
    let mut req = request(Method::GET, "/api/products/1", None, None);
    req.headers_mut().insert(
        header::AUTHORIZATION,
        "Token abc".parse().unwrap_or_else(|_| unreachable!()),
    );
    let response = app.send(req).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_token_is_401_even_on_reads() {
    let app = TestApp::new();
    let forged = TokenSigner::new(SecretString::from("another-secret-entirely-0123456789".to_string()))
        .issue(Role::Staff, Duration::hours(1))
        .unwrap_or_default();
    let response = app.get_as("/api/products", &forged).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let app = TestApp::new();
    let expired = TokenSigner::new(SecretString::from(TEST_SECRET.to_string()))
        .issue_at(Role::Staff, Utc::now() - Duration::minutes(5))
        .unwrap_or_default();
    let response = app
        .post_json("/api/categories", Some(&expired), &json!({ "name": "Shirts" }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_viewer_cannot_write() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/categories",
            Some(&token(Role::Viewer)),
            &json!({ "name": "Shirts" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_editor_cannot_bulk_edit() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products/bulk/status",
            Some(&token(Role::Editor)),
            &json!({ "ids": [1, 2], "status": "archived" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_editor_cannot_manage_tax() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/tax-classes",
            Some(&token(Role::Editor)),
            &json!({ "name": "Standard" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bundle_upload_is_staff_only() {
    let app = TestApp::new();
    let response = app
        .send(request(
            Method::POST,
            "/api/admin/bundle",
            Some(&token(Role::Manager)),
            None,
        ))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}
