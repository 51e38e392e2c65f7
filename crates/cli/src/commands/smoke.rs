//! Smoke checks against a running server.
//!
//! # Usage
//!
//! ```bash
//! emp-cli smoke --base-url http://localhost:8000
//! emp-cli smoke --base-url https://api.example.com --token "$EMPORIUM_TOKEN"
//! ```
//!
//! Without a token only the public surface is checked. With a token that
//! grants catalog writes, a validation failure and a category
//! create/read/delete round trip are checked as well. Nothing is left
//! behind on success.

use std::time::Duration;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum SmokeError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("{0} of {1} smoke checks failed")]
    Failed(usize, usize),
}

/// Outcome of one smoke check.
#[derive(Debug)]
pub struct CheckOutcome {
    pub name: String,
    pub result: Result<(), String>,
}

/// A response reduced to what the checks look at.
#[derive(Debug)]
struct Reply {
    status: StatusCode,
    body: Value,
}

type Assertion = fn(&Value) -> Result<(), String>;

struct SmokeClient {
    http: reqwest::Client,
    base: Url,
    token: Option<SecretString>,
}

impl SmokeClient {
    fn new(base_url: &str, token: Option<SecretString>) -> Result<Self, SmokeError> {
        let http = reqwest::Client::builder()
            .timeout(TIMEOUT)
            .user_agent(concat!("emp-cli/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: normalize_base(base_url)?,
            token,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<Reply, String> {
        let url = self.base.join(path).map_err(|e| e.to_string())?;
        let mut request = self.http.request(method, url);
        if authenticated && let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        // Plain-text bodies (health) become JSON strings
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(Reply { status, body })
    }
}

/// Parse the base URL and make sure relative joins keep its path.
fn normalize_base(raw: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Compare a reply with the expected status and run the body assertion.
fn evaluate(expected: StatusCode, reply: &Reply, assertion: Option<Assertion>) -> Result<(), String> {
    if reply.status != expected {
        return Err(format!(
            "expected {}, got {}: {}",
            expected.as_u16(),
            reply.status.as_u16(),
            truncate(&reply.body.to_string(), 200)
        ));
    }
    assertion.map_or(Ok(()), |check| check(&reply.body))
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

fn is_page(body: &Value) -> Result<(), String> {
    match (body.get("count"), body.get("results")) {
        (Some(Value::Number(_)), Some(Value::Array(_))) => Ok(()),
        _ => Err("response is not a page with count and results".to_string()),
    }
}

fn is_array(body: &Value) -> Result<(), String> {
    if body.is_array() {
        Ok(())
    } else {
        Err("response is not an array".to_string())
    }
}

fn has_detail(body: &Value) -> Result<(), String> {
    if body.get("detail").is_some_and(Value::is_string) {
        Ok(())
    } else {
        Err("error body has no detail".to_string())
    }
}

fn has_name_error(body: &Value) -> Result<(), String> {
    if body.pointer("/errors/name").is_some_and(Value::is_array) {
        Ok(())
    } else {
        Err("validation errors do not mention name".to_string())
    }
}

fn graphql_ok(body: &Value) -> Result<(), String> {
    if let Some(errors) = body.get("errors") {
        return Err(format!("GraphQL errors: {errors}"));
    }
    if body.pointer("/data/products/totalCount").is_some_and(Value::is_number) {
        Ok(())
    } else {
        Err("GraphQL response has no products.totalCount".to_string())
    }
}

/// Check list: `(name, method, path, body, authenticated, expected, assertion)`.
type PublicCheck = (&'static str, Method, &'static str, Option<Value>, bool, StatusCode, Option<Assertion>);

fn public_checks() -> Vec<PublicCheck> {
    vec![
        ("liveness", Method::GET, "health", None, false, StatusCode::OK, None),
        ("readiness", Method::GET, "health/ready", None, false, StatusCode::OK, None),
        ("product listing", Method::GET, "api/products?page_size=5", None, false, StatusCode::OK, Some(is_page)),
        ("category tree", Method::GET, "api/categories/tree", None, false, StatusCode::OK, Some(is_array)),
        ("currencies", Method::GET, "api/currencies", None, false, StatusCode::OK, None),
        (
            "unknown product",
            Method::GET,
            "api/products/2147483647",
            None,
            false,
            StatusCode::NOT_FOUND,
            Some(has_detail),
        ),
        (
            "anonymous write rejected",
            Method::POST,
            "api/categories",
            Some(json!({ "name": "Smoke" })),
            false,
            StatusCode::UNAUTHORIZED,
            Some(has_detail),
        ),
        (
            "graphql",
            Method::POST,
            "graphql",
            Some(json!({ "query": "{ products(first: 1) { totalCount } }" })),
            false,
            StatusCode::OK,
            Some(graphql_ok),
        ),
    ]
}

fn authenticated_checks() -> Vec<PublicCheck> {
    vec![(
        "validation rejected",
        Method::POST,
        "api/categories",
        Some(json!({ "name": "   " })),
        true,
        StatusCode::BAD_REQUEST,
        Some(has_name_error),
    )]
}

/// Create, fetch and delete a throwaway category.
async fn category_round_trip(client: &SmokeClient) -> Result<(), String> {
    let name = format!("Smoke {}", uuid::Uuid::new_v4().simple());
    let created = client
        .send(Method::POST, "api/categories", Some(&json!({ "name": name })), true)
        .await?;
    evaluate(StatusCode::CREATED, &created, None)?;
    let id = created
        .body
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| "created category has no id".to_string())?;

    let path = format!("api/categories/{id}");
    let fetched = client.send(Method::GET, &path, None, true).await?;
    let fetch_result = evaluate(StatusCode::OK, &fetched, None).and_then(|()| {
        if fetched.body.get("name").and_then(Value::as_str) == Some(name.as_str()) {
            Ok(())
        } else {
            Err("fetched category has a different name".to_string())
        }
    });

    // Always clean up, even when the fetch failed
    let deleted = client.send(Method::DELETE, &path, None, true).await?;
    fetch_result?;
    evaluate(StatusCode::NO_CONTENT, &deleted, None)
}

/// Run the smoke checks and log each outcome.
///
/// # Errors
///
/// Returns `SmokeError::Failed` when any check fails.
pub async fn run(base_url: &str, token: Option<SecretString>) -> Result<Vec<CheckOutcome>, SmokeError> {
    let has_token = token.is_some();
    let client = SmokeClient::new(base_url, token)?;
    tracing::info!(base = %client.base, authenticated = has_token, "Running smoke checks");

    let mut checks = public_checks();
    if has_token {
        checks.extend(authenticated_checks());
    }

    let mut outcomes = Vec::with_capacity(checks.len() + 1);
    for (name, method, path, body, authenticated, expected, assertion) in checks {
        let result = match client.send(method, path, body.as_ref(), authenticated).await {
            Ok(reply) => evaluate(expected, &reply, assertion),
            Err(e) => Err(e),
        };
        outcomes.push(CheckOutcome {
            name: name.to_string(),
            result,
        });
    }
    if has_token {
        outcomes.push(CheckOutcome {
            name: "category round trip".to_string(),
            result: category_round_trip(&client).await,
        });
    }

    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => tracing::info!(check = %outcome.name, "PASS"),
            Err(reason) => tracing::error!(check = %outcome.name, "FAIL: {reason}"),
        }
    }

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        return Err(SmokeError::Failed(failed, outcomes.len()));
    }
    tracing::info!(count = outcomes.len(), "All smoke checks passed");
    Ok(outcomes)
}
