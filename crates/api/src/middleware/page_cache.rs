//! Response caching for anonymous catalog reads.
//!
//! Anonymous `GET` requests are served from [`PageCache`] keyed by the full
//! URI plus the negotiated language and currency. Only `200` responses up to
//! [`MAX_CACHED_BODY`] are stored. Any successful write through the API clears
//! the whole cache.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::context::RequestContext;
use crate::error::AppError;
use crate::services::page_cache::{CachedPage, MAX_CACHED_BODY, PageCache};
use crate::state::AppState;

/// Header reporting whether a response came from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-cache";

fn is_read(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Serve anonymous reads from the page cache and clear it after writes.
pub async fn page_cache_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    if !is_read(&method) {
        let response = next.run(request).await;
        if response.status().is_success() {
            state.page_cache().clear();
            tracing::debug!(method = %method, "Page cache cleared after write");
        }
        return response;
    }

    if method != Method::GET || request.headers().contains_key(AUTHORIZATION) {
        return next.run(request).await;
    }

    let context = RequestContext::resolve(
        request.uri(),
        request.headers(),
        &state.config().locale,
    );
    let key = PageCache::key(
        &request.uri().to_string(),
        context.language.as_str(),
        context.currency.code(),
    );

    if let Some(page) = state.page_cache().get(&key).await {
        return cached_response(page, "hit");
    }

    let response = next.run(request).await;
    if response.status() != StatusCode::OK {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => return AppError::Internal(format!("reading response body: {e}")).into_response(),
    };

    if bytes.len() <= MAX_CACHED_BODY {
        let page = CachedPage {
            status: parts.status,
            content_type: parts.headers.get(CONTENT_TYPE).cloned(),
            body: bytes.clone(),
        };
        state.page_cache().insert(key, page).await;
    }

    let mut response = Response::from_parts(parts, Body::from(bytes));
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("miss"));
    response
}

fn cached_response(page: CachedPage, status: &'static str) -> Response {
    let mut response = (page.status, page.body).into_response();
    if let Some(content_type) = page.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static(status));
    response
}
