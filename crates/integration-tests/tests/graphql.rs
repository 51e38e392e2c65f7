//! GraphQL endpoint: permissions and error shape.

use axum::http::StatusCode;
use emporium_core::Role;
use emporium_integration_tests::{TestApp, token};

const CREATE_BLANK: &str = r#"mutation { categoryCreate(input: { name: "  " }) { id } }"#;

#[tokio::test]
async fn test_graphiql_is_served() {
    let app = TestApp::new();
    let response = app.get("/graphql").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&response.body).contains("graphiql"));
}

#[tokio::test]
async fn test_anonymous_mutation_is_unauthenticated() {
    let app = TestApp::new();
    let body = app.graphql(CREATE_BLANK, None).await;
    assert_eq!(body["errors"][0]["extensions"]["status"], 401, "{body}");
}

#[tokio::test]
async fn test_viewer_mutation_is_forbidden() {
    let app = TestApp::new();
    let body = app.graphql(CREATE_BLANK, Some(&token(Role::Viewer))).await;
    assert_eq!(body["errors"][0]["extensions"]["status"], 403, "{body}");
}

#[tokio::test]
async fn test_validation_errors_carry_fields() {
    let app = TestApp::new();
    let body = app.graphql(CREATE_BLANK, Some(&token(Role::Editor))).await;
    let error = &body["errors"][0];
    assert_eq!(error["message"], "Validation failed", "{body}");
    assert_eq!(error["extensions"]["status"], 400);
    assert!(error["extensions"]["fields"]["name"].is_array());
}

#[tokio::test]
async fn test_unknown_field_is_rejected() {
    let app = TestApp::new();
    let body = app.graphql("{ products { nope } }", None).await;
    assert!(body["errors"].is_array());
    assert!(body.get("data").is_none_or(serde_json::Value::is_null));
}

#[tokio::test]
async fn test_deep_queries_are_rejected() {
    let app = TestApp::new();
    let mut query = String::from("{ categoryTree { ");
    for _ in 0..15 {
        query.push_str("children { ");
    }
    query.push_str("category { id }");
    for _ in 0..16 {
        query.push_str(" }");
    }
    query.push_str(" }");

    let body = app.graphql(&query, None).await;
    let message = body["errors"][0]["message"].as_str().unwrap_or_default();
    assert!(message.to_lowercase().contains("nested too deep"), "{body}");
}
