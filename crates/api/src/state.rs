//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::services::auth::TokenSigner;
use crate::services::currency::{CurrencyError, CurrencyService};
use crate::services::page_cache::PageCache;
use crate::services::storage::{self, MediaStorage, StorageError};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("currency service: {0}")]
    Currency(#[from] CurrencyError),
    #[error("media storage: {0}")]
    Storage(#[from] StorageError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    pool: PgPool,
    currency: Arc<CurrencyService>,
    storage: Arc<dyn MediaStorage>,
    signer: TokenSigner,
    page_cache: PageCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - API configuration
    /// * `pool` - `PostgreSQL` connection pool
    ///
    /// # Errors
    ///
    /// Returns an error if the rate source or storage client fails to build.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let currency = CurrencyService::from_config(
            pool.clone(),
            config.locale.base_currency,
            &config.rates,
        )?;
        let storage: Arc<dyn MediaStorage> = Arc::from(storage::from_config(&config.storage)?);
        let signer = TokenSigner::new(config.api_secret.clone());
        let page_cache = PageCache::new(config.page_cache_ttl);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                currency: Arc::new(currency),
                storage,
                signer,
                page_cache,
            }),
        })
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the currency conversion service.
    #[must_use]
    pub fn currency(&self) -> &Arc<CurrencyService> {
        &self.inner.currency
    }

    /// Get the media storage backend.
    #[must_use]
    pub fn storage(&self) -> &dyn MediaStorage {
        self.inner.storage.as_ref()
    }

    /// Get the bearer token signer.
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    /// Get the public page cache.
    #[must_use]
    pub fn page_cache(&self) -> &PageCache {
        &self.inner.page_cache
    }
}
