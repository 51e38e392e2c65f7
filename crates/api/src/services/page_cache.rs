//! Time-boxed cache of public GET responses.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode};
use bytes::Bytes;
use moka::future::Cache;

/// Responses larger than this are never cached.
pub const MAX_CACHED_BODY: usize = 2 * 1024 * 1024;

/// A stored response.
#[derive(Debug, Clone)]
pub struct CachedPage {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

/// Shared page cache keyed by URI and negotiated request context.
#[derive(Clone)]
pub struct PageCache {
    cache: Cache<String, CachedPage>,
}

impl PageCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cache key for a request.
    #[must_use]
    pub fn key(uri: &str, language: &str, currency: &str) -> String {
        format!("{language}|{currency}|{uri}")
    }

    pub async fn get(&self, key: &str) -> Option<CachedPage> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: String, page: CachedPage) {
        self.cache.insert(key, page).await;
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_get_clear() {
        let cache = PageCache::new(Duration::from_secs(60));
        let key = PageCache::key("/api/products?page=2", "de", "EUR");
        cache
            .insert(
                key.clone(),
                CachedPage {
                    status: StatusCode::OK,
                    content_type: Some(HeaderValue::from_static("application/json")),
                    body: Bytes::from_static(b"{}"),
                },
            )
            .await;
        assert!(cache.get(&key).await.is_some());
        assert!(cache.get(&PageCache::key("/api/products?page=2", "en", "EUR")).await.is_none());

        cache.clear();
        assert!(cache.get(&key).await.is_none());
    }
}
