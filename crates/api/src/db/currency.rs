//! Stored exchange rates, the fallback behind the in-process rate cache.

use chrono::{DateTime, Utc};
use emporium_core::CurrencyCode;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::{RepositoryError, parse_currency};

/// One stored `base → target` rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeRate {
    pub base: CurrencyCode,
    pub target: CurrencyCode,
    pub rate: Decimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ExchangeRateRow {
    base_currency: String,
    target_currency: String,
    rate: Decimal,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ExchangeRateRow> for ExchangeRate {
    type Error = RepositoryError;

    fn try_from(row: ExchangeRateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            base: parse_currency(&row.base_currency)?,
            target: parse_currency(&row.target_currency)?,
            rate: row.rate,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for `catalog.currency_exchange`.
pub struct ExchangeRateRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ExchangeRateRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The stored rate for a pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_rate(
        &self,
        base: CurrencyCode,
        target: CurrencyCode,
    ) -> Result<Option<Decimal>, RepositoryError> {
        Ok(sqlx::query_scalar(
            "SELECT rate FROM catalog.currency_exchange WHERE base_currency = $1 AND target_currency = $2",
        )
        .bind(base.code())
        .bind(target.code())
        .fetch_optional(self.pool)
        .await?)
    }

    /// Insert or overwrite rates from `base`; returns how many were written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails.
    #[instrument(skip(self, rates), fields(base = %base.code(), count = rates.len()))]
    pub async fn upsert_rates(
        &self,
        base: CurrencyCode,
        rates: &[(CurrencyCode, Decimal)],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;
        for (target, rate) in rates {
            let result = sqlx::query(
                r"
                INSERT INTO catalog.currency_exchange (base_currency, target_currency, rate, updated_at)
                VALUES ($1, $2, $3, now())
                ON CONFLICT (base_currency, target_currency)
                DO UPDATE SET rate = EXCLUDED.rate, updated_at = EXCLUDED.updated_at
                ",
            )
            .bind(base.code())
            .bind(target.code())
            .bind(rate)
            .execute(&mut *tx)
            .await?;
            written += result.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }

    /// Every stored rate from `base`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails and
    /// `RepositoryError::DataCorruption` for unknown stored currency codes.
    pub async fn list_rates(&self, base: CurrencyCode) -> Result<Vec<ExchangeRate>, RepositoryError> {
        sqlx::query_as::<_, ExchangeRateRow>(
            r"
            SELECT base_currency, target_currency, rate, updated_at
            FROM catalog.currency_exchange
            WHERE base_currency = $1
            ORDER BY target_currency
            ",
        )
        .bind(base.code())
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(ExchangeRate::try_from)
        .collect()
    }
}
