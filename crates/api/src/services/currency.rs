//! Exchange rates and currency conversion.
//!
//! Rates are `base → target` multipliers. Lookups go through an in-process
//! `moka` cache (one-week TTL) and fall back to the `currency_exchange`
//! table on a miss. A [`RateSource`] refreshes both.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use emporium_core::locale::LanguageCode;
use emporium_core::money::format_amount;
use emporium_core::{CurrencyCode, Price};
use moka::future::Cache;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use crate::config::RatesConfig;
use crate::db::{ExchangeRateRepository, RepositoryError};
use crate::models::PriceView;

/// How long a cached rate is trusted.
const RATE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Errors that can occur during rate lookup and conversion.
#[derive(Debug, Error)]
pub enum CurrencyError {
    /// No rate is known for the pair.
    #[error("no exchange rate from {base} to {target}")]
    MissingRate {
        base: CurrencyCode,
        target: CurrencyCode,
    },

    /// The rate source failed.
    #[error("rate source error: {0}")]
    Source(String),

    /// HTTP request to the rate source failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading or writing stored rates failed.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),

    /// The converted amount does not fit in a decimal.
    #[error("converted amount out of range")]
    Overflow,
}

/// One rate returned by a [`RateSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchedRate {
    pub target: CurrencyCode,
    pub rate: Decimal,
}

/// A provider of `base → target` exchange rates.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Fetch every rate the source knows from `base`.
    async fn fetch(&self, base: CurrencyCode) -> Result<Vec<FetchedRate>, CurrencyError>;
}

/// A static rate table from configuration.
#[derive(Debug, Clone, Default)]
pub struct FixedRateSource {
    rates: Vec<FetchedRate>,
}

impl FixedRateSource {
    #[must_use]
    pub fn new(rates: impl IntoIterator<Item = (CurrencyCode, Decimal)>) -> Self {
        let mut rates: Vec<FetchedRate> = rates
            .into_iter()
            .map(|(target, rate)| FetchedRate { target, rate })
            .collect();
        rates.sort_by_key(|r| r.target);
        Self { rates }
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn fetch(&self, base: CurrencyCode) -> Result<Vec<FetchedRate>, CurrencyError> {
        Ok(self
            .rates
            .iter()
            .copied()
            .filter(|r| r.target != base)
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: serde_json::Map<String, serde_json::Value>,
}

/// An HTTP endpoint answering `GET {url}?base=XXX` with
/// `{"rates": {"EUR": "0.91", ...}}`. Rates may be strings or numbers.
#[derive(Clone)]
pub struct HttpRateSource {
    client: reqwest::Client,
    url: url::Url,
    api_key: Option<SecretString>,
}

impl HttpRateSource {
    /// Create a client for the rate endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(url: url::Url, api_key: Option<SecretString>) -> Result<Self, CurrencyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

fn parse_rates(body: RatesResponse) -> Vec<FetchedRate> {
    let mut rates = Vec::with_capacity(body.rates.len());
    for (code, value) in body.rates {
        let Ok(target) = code.parse::<CurrencyCode>() else {
            tracing::debug!(currency = %code, "Skipping unsupported currency");
            continue;
        };
        let parsed = match &value {
            serde_json::Value::String(s) => s.trim().parse::<Decimal>().ok(),
            serde_json::Value::Number(n) => n.to_string().parse::<Decimal>().ok(),
            _ => None,
        };
        match parsed {
            Some(rate) if rate > Decimal::ZERO => rates.push(FetchedRate { target, rate }),
            _ => tracing::warn!(currency = %code, value = %value, "Ignoring invalid rate"),
        }
    }
    rates.sort_by_key(|r| r.target);
    rates
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self), fields(base = %base.code()))]
    async fn fetch(&self, base: CurrencyCode) -> Result<Vec<FetchedRate>, CurrencyError> {
        let mut request = self.client.get(self.url.clone()).query(&[("base", base.code())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CurrencyError::Source(format!(
                "HTTP {status}: {}",
                body.chars().take(200).collect::<String>()
            )));
        }
        let body: RatesResponse = response
            .json()
            .await
            .map_err(|e| CurrencyError::Source(format!("invalid response: {e}")))?;
        Ok(parse_rates(body))
    }
}

/// Converts amounts between currencies using cached base rates.
pub struct CurrencyService {
    pool: PgPool,
    base: CurrencyCode,
    source: Arc<dyn RateSource>,
    cache: Cache<CurrencyCode, Decimal>,
}

impl CurrencyService {
    #[must_use]
    pub fn new(pool: PgPool, base: CurrencyCode, source: Arc<dyn RateSource>) -> Self {
        let cache = Cache::builder()
            .max_capacity(512)
            .time_to_live(RATE_TTL)
            .build();
        Self {
            pool,
            base,
            source,
            cache,
        }
    }

    /// Build the service with the rate source named by configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP rate client fails to build.
    pub fn from_config(
        pool: PgPool,
        base: CurrencyCode,
        config: &RatesConfig,
    ) -> Result<Self, CurrencyError> {
        let source: Arc<dyn RateSource> = match &config.url {
            Some(url) => Arc::new(HttpRateSource::new(url.clone(), config.api_key.clone())?),
            None => Arc::new(FixedRateSource::new(
                config.fixed.iter().map(|(code, rate)| (*code, *rate)),
            )),
        };
        Ok(Self::new(pool, base, source))
    }

    /// The currency prices are stored in.
    #[must_use]
    pub const fn base(&self) -> CurrencyCode {
        self.base
    }

    /// Name of the configured rate source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Put a rate straight into the cache.
    pub async fn remember(&self, target: CurrencyCode, rate: Decimal) {
        self.cache.insert(target, rate).await;
    }

    /// The `base → target` rate.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::MissingRate` when neither the cache nor the
    /// database knows the pair.
    pub async fn rate(&self, target: CurrencyCode) -> Result<Decimal, CurrencyError> {
        if target == self.base {
            return Ok(Decimal::ONE);
        }
        if let Some(rate) = self.cache.get(&target).await {
            return Ok(rate);
        }
        let stored = ExchangeRateRepository::new(&self.pool)
            .get_rate(self.base, target)
            .await?;
        match stored {
            Some(rate) => {
                self.cache.insert(target, rate).await;
                Ok(rate)
            }
            None => Err(CurrencyError::MissingRate {
                base: self.base,
                target,
            }),
        }
    }

    /// Convert `amount` from one currency to another.
    ///
    /// Amounts not in the base currency are first divided by the base rate
    /// of their currency. The result is not rounded.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::MissingRate` if a needed rate is unknown, and
    /// `CurrencyError::Overflow` if the result is out of decimal range.
    pub async fn convert(
        &self,
        amount: Decimal,
        from: CurrencyCode,
        to: CurrencyCode,
    ) -> Result<Decimal, CurrencyError> {
        if from == to {
            return Ok(amount);
        }
        let mut value = amount;
        if from != self.base {
            let rate = self.rate(from).await?;
            if rate.is_zero() {
                return Err(CurrencyError::MissingRate {
                    base: self.base,
                    target: from,
                });
            }
            value = value.checked_div(rate).ok_or(CurrencyError::Overflow)?;
        }
        if to != self.base {
            let rate = self.rate(to).await?;
            value = value.checked_mul(rate).ok_or(CurrencyError::Overflow)?;
        }
        Ok(value)
    }

    /// A price converted to `target` and formatted for `language`.
    ///
    /// Without a rate the price is shown in its own currency.
    pub async fn price_view(&self, price: Price, target: CurrencyCode, language: &LanguageCode) -> PriceView {
        let converted = match self.convert(price.amount, price.currency_code, target).await {
            Ok(amount) => Price::new(amount, target),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    from = %price.currency_code.code(),
                    to = %target.code(),
                    "Showing price in its own currency"
                );
                price
            }
        }
        .rounded();
        PriceView {
            amount: converted.amount,
            currency: converted.currency_code,
            formatted: format_amount(converted.amount, converted.currency_code, language),
        }
    }

    /// Load every stored rate into the cache; returns how many were loaded.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyError::Database` if the query fails.
    pub async fn prime(&self) -> Result<usize, CurrencyError> {
        let rates = ExchangeRateRepository::new(&self.pool)
            .list_rates(self.base)
            .await?;
        for rate in &rates {
            self.cache.insert(rate.target, rate.rate).await;
        }
        Ok(rates.len())
    }

    /// Fetch fresh rates from the source, store them, and cache them.
    ///
    /// # Errors
    ///
    /// Returns error if the source or the database write fails.
    #[instrument(skip(self), fields(base = %self.base.code(), source = self.source.name()))]
    pub async fn refresh(&self) -> Result<usize, CurrencyError> {
        let fetched = self.source.fetch(self.base).await?;
        let pairs: Vec<(CurrencyCode, Decimal)> =
            fetched.iter().map(|r| (r.target, r.rate)).collect();
        ExchangeRateRepository::new(&self.pool)
            .upsert_rates(self.base, &pairs)
            .await?;
        for rate in &fetched {
            self.cache.insert(rate.target, rate.rate).await;
        }
        tracing::info!(count = fetched.len(), "Exchange rates refreshed");
        Ok(fetched.len())
    }

    /// Refresh rates every `interval` until the runtime shuts down.
    pub fn spawn_refresh(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "Background rate refresh failed");
                }
            }
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn service() -> CurrencyService {
        let pool = PgPool::connect_lazy("postgres://localhost/emporium_unused").unwrap();
        CurrencyService::new(pool, CurrencyCode::USD, Arc::new(FixedRateSource::default()))
    }

    #[tokio::test]
    async fn test_same_currency_is_identity() {
        let svc = service();
        let amount = dec("19.99");
        assert_eq!(svc.convert(amount, CurrencyCode::USD, CurrencyCode::USD).await.unwrap(), amount);
        assert_eq!(svc.convert(amount, CurrencyCode::EUR, CurrencyCode::EUR).await.unwrap(), amount);
    }

    #[tokio::test]
    async fn test_convert_from_base() {
        let svc = service();
        svc.remember(CurrencyCode::EUR, dec("0.9")).await;
        let converted = svc
            .convert(dec("10"), CurrencyCode::USD, CurrencyCode::EUR)
            .await
            .unwrap();
        assert_eq!(converted, dec("9.0"));
    }

    #[tokio::test]
    async fn test_cross_conversion_goes_through_base() {
        let svc = service();
        svc.remember(CurrencyCode::EUR, dec("0.5")).await;
        svc.remember(CurrencyCode::GBP, dec("0.25")).await;
        let converted = svc
            .convert(dec("10"), CurrencyCode::EUR, CurrencyCode::GBP)
            .await
            .unwrap();
        assert_eq!(converted.normalize(), dec("5"));
    }

    #[tokio::test]
    async fn test_convert_out_of_range_is_an_error() {
        let svc = service();
        svc.remember(CurrencyCode::JPY, dec("150")).await;
        let huge = dec("1000000000000000000000000000");
        let err = svc
            .convert(huge, CurrencyCode::USD, CurrencyCode::JPY)
            .await
            .unwrap_err();
        assert!(matches!(err, CurrencyError::Overflow));

        svc.remember(CurrencyCode::EUR, dec("0.0001")).await;
        let err = svc
            .convert(huge, CurrencyCode::EUR, CurrencyCode::USD)
            .await
            .unwrap_err();
        assert!(matches!(err, CurrencyError::Overflow));
    }

    #[tokio::test]
    async fn test_price_view_formats_in_target() {
        let svc = service();
        svc.remember(CurrencyCode::EUR, dec("0.9")).await;
        let de = LanguageCode::parse("de").unwrap();
        let view = svc
            .price_view(Price::new(dec("10"), CurrencyCode::USD), CurrencyCode::EUR, &de)
            .await;
        assert_eq!(view.currency, CurrencyCode::EUR);
        assert_eq!(view.amount, dec("9.00"));
        assert!(view.formatted.contains("9,00"));
    }

    #[tokio::test]
    async fn test_fixed_source_skips_base() {
        let source = FixedRateSource::new([
            (CurrencyCode::EUR, dec("0.9")),
            (CurrencyCode::USD, dec("1")),
        ]);
        let rates = source.fetch(CurrencyCode::USD).await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates.first().map(|r| r.target), Some(CurrencyCode::EUR));
    }

    #[test]
    fn test_parse_rates_accepts_strings_and_numbers() {
        let body: RatesResponse = serde_json::from_value(serde_json::json!({
            "rates": { "EUR": "0.91", "GBP": 0.79, "XXX": "1.0", "JPY": "-3", "CHF": null }
        }))
        .unwrap();
        let rates = parse_rates(body);
        let targets: Vec<CurrencyCode> = rates.iter().map(|r| r.target).collect();
        assert!(targets.contains(&CurrencyCode::EUR));
        assert!(targets.contains(&CurrencyCode::GBP));
        assert!(!targets.contains(&CurrencyCode::JPY));
        assert_eq!(rates.len(), 2);
    }
}
