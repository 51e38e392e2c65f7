//! Tax classes and their jurisdiction rates.

use emporium_core::catalog::{PageRequest, TaxRateRule, select_rate};
use emporium_core::{TaxClassId, TaxRateId};
use sqlx::PgPool;
use tracing::instrument;

use super::{RepositoryError, map_delete_error, map_write_error};
use crate::models::{TaxClass, TaxClassInput, TaxRate, TaxRateInput, clean};

const RATE_COLUMNS: &str = "id, tax_class_id, country, state, rate, created_at";

/// Repository for the `tax` schema.
pub struct TaxRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TaxRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of tax classes ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_classes(&self, page: PageRequest) -> Result<(Vec<TaxClass>, i64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tax.tax_class")
            .fetch_one(self.pool)
            .await?;
        let rows = sqlx::query_as::<_, TaxClass>(
            "SELECT id, name, description, created_at FROM tax.tax_class \
             ORDER BY name, id LIMIT $1 OFFSET $2",
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;
        Ok((rows, count))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_class(&self, id: TaxClassId) -> Result<Option<TaxClass>, RepositoryError> {
        Ok(sqlx::query_as::<_, TaxClass>(
            "SELECT id, name, description, created_at FROM tax.tax_class WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate name.
    #[instrument(skip(self, input))]
    pub async fn create_class(&self, input: &TaxClassInput) -> Result<TaxClass, RepositoryError> {
        sqlx::query_as::<_, TaxClass>(
            r"
            INSERT INTO tax.tax_class (name, description) VALUES ($1, $2)
            RETURNING id, name, description, created_at
            ",
        )
        .bind(input.name.as_deref().unwrap_or_default().trim())
        .bind(clean(input.description.clone().flatten()))
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the class does not exist.
    pub async fn update_class(
        &self,
        id: TaxClassId,
        input: &TaxClassInput,
    ) -> Result<TaxClass, RepositoryError> {
        sqlx::query_as::<_, TaxClass>(
            r"
            UPDATE tax.tax_class
            SET name = COALESCE($2, name),
                description = CASE WHEN $3 THEN $4 ELSE description END
            WHERE id = $1
            RETURNING id, name, description, created_at
            ",
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .bind(input.description.is_some())
        .bind(clean(input.description.clone().flatten()))
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a class and its rates.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` while products still use the class.
    #[instrument(skip(self))]
    pub async fn delete_class(&self, id: TaxClassId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax.tax_class WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_delete_error(e, "tax class"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Every rate of a class, country then state order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rates_for_class(&self, class: TaxClassId) -> Result<Vec<TaxRate>, RepositoryError> {
        let sql = format!(
            "SELECT {RATE_COLUMNS} FROM tax.tax_rate WHERE tax_class_id = $1 \
             ORDER BY country, state NULLS FIRST, id"
        );
        Ok(sqlx::query_as::<_, TaxRate>(&sql)
            .bind(class)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_rate(&self, id: TaxRateId) -> Result<Option<TaxRate>, RepositoryError> {
        let sql = format!("SELECT {RATE_COLUMNS} FROM tax.tax_rate WHERE id = $1");
        Ok(sqlx::query_as::<_, TaxRate>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Add a rate to a class.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` for a bad rule or unknown class, and
    /// `RepositoryError::Conflict` when the jurisdiction already has a rate.
    #[instrument(skip(self, input))]
    pub async fn create_rate(
        &self,
        class: TaxClassId,
        input: &TaxRateInput,
    ) -> Result<TaxRate, RepositoryError> {
        let rule = input.resolve(None)?;
        let sql = format!(
            "INSERT INTO tax.tax_rate (tax_class_id, country, state, rate) VALUES ($1, $2, $3, $4) \
             RETURNING {RATE_COLUMNS}"
        );
        sqlx::query_as::<_, TaxRate>(&sql)
            .bind(class)
            .bind(&rule.country)
            .bind(rule.state.as_deref())
            .bind(rule.rate)
            .fetch_one(self.pool)
            .await
            .map_err(map_write_error)
    }

    /// Update a rate, merging the input onto the stored rule.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rate does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_rate(&self, id: TaxRateId, input: &TaxRateInput) -> Result<TaxRate, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {RATE_COLUMNS} FROM tax.tax_rate WHERE id = $1 FOR UPDATE");
        let existing = sqlx::query_as::<_, TaxRate>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let rule = input.resolve(Some(&existing))?;

        let sql = format!(
            "UPDATE tax.tax_rate SET country = $2, state = $3, rate = $4 WHERE id = $1 \
             RETURNING {RATE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, TaxRate>(&sql)
            .bind(id)
            .bind(&rule.country)
            .bind(rule.state.as_deref())
            .bind(rule.rate)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the rate does not exist.
    pub async fn delete_rate(&self, id: TaxRateId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM tax.tax_rate WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// The rate that applies to a location: state-specific beats country-wide.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lookup(
        &self,
        class: TaxClassId,
        country: &str,
        state: Option<&str>,
    ) -> Result<Option<TaxRate>, RepositoryError> {
        let rates: Vec<(TaxRate, TaxRateRule)> = self
            .rates_for_class(class)
            .await?
            .into_iter()
            .map(|rate| {
                let rule = rate.rule();
                (rate, rule)
            })
            .collect();
        Ok(select_rate(&rates, country, state, |(_, rule)| rule).map(|(rate, _)| rate.clone()))
    }
}
