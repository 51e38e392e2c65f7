//! Request validation that rejects input before it reaches the database.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use emporium_core::Role;
use emporium_integration_tests::{TestApp, token};
use serde_json::json;

#[tokio::test]
async fn test_blank_category_name_is_field_error() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/categories",
            Some(&token(Role::Editor)),
            &json!({ "name": "   " }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(body["errors"]["name"].is_array(), "{body}");
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/categories")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(Role::Editor)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap_or_else(|_| unreachable!());
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blank_product_name_is_field_error() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products",
            Some(&token(Role::Editor)),
            &json!({ "name": "", "category_id": 1 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["name"].is_array());
}

#[tokio::test]
async fn test_bulk_requires_ids() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products/bulk/delete",
            Some(&token(Role::Manager)),
            &json!({ "ids": [] }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["ids"].is_array());
}

#[tokio::test]
async fn test_bulk_rejects_oversized_batches() {
    let app = TestApp::new();
    let ids: Vec<i32> = (1..=501).collect();
    let response = app
        .post_json(
            "/api/products/bulk/status",
            Some(&token(Role::Manager)),
            &json!({ "ids": ids, "status": "published" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_non_numeric_id_is_404() {
    let app = TestApp::new();
    let response = app.get("/api/products/linen-shirt").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(response.json()["detail"].is_string());
}

#[tokio::test]
async fn test_negative_conversion_amount_is_400() {
    let app = TestApp::new();
    let response = app
        .get("/api/currencies/convert?amount=-5&from=USD&to=EUR")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["amount"].is_array());
}

#[tokio::test]
async fn test_unknown_currency_is_400() {
    let app = TestApp::new();
    let response = app
        .get("/api/currencies/convert?amount=5&from=USD&to=XYZ")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

fn product_payload(variants: serde_json::Value) -> serde_json::Value {
    json!({ "name": "Linen Shirt", "category_id": 1, "variants": variants })
}

#[tokio::test]
async fn test_product_without_variants_is_400() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products",
            Some(&token(Role::Editor)),
            &product_payload(json!([])),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(body["errors"]["variants"].is_array(), "{body}");
}

#[tokio::test]
async fn test_product_with_repeated_sku_is_400() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products",
            Some(&token(Role::Editor)),
            &product_payload(json!([
                { "name": "S", "sku": "LINEN-1", "price": "49.00", "cost": "20.00", "is_default": true },
                { "name": "M", "sku": " LINEN-1 ", "price": "52.00", "cost": "21.00" }
            ])),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(body["errors"]["variants[1].sku"].is_array(), "{body}");
    assert!(body["errors"].get("variants[0].sku").is_none(), "{body}");
}

#[tokio::test]
async fn test_product_with_two_defaults_is_400() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/api/products",
            Some(&token(Role::Editor)),
            &product_payload(json!([
                { "name": "S", "price": "49.00", "cost": "20.00", "is_default": true },
                { "name": "M", "price": "52.00", "cost": "21.00", "is_default": true }
            ])),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["variants"].is_array());
}

#[tokio::test]
async fn test_negative_tax_amount_is_400() {
    let app = TestApp::new();
    let response = app
        .get("/api/tax-classes/1/lookup?country=DE&amount=-1")
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["errors"]["amount"].is_array());
}
