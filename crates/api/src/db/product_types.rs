//! Product type repository.

use emporium_core::ProductTypeId;
use emporium_core::catalog::PageRequest;
use sqlx::PgPool;

use super::{RepositoryError, map_write_error};
use crate::models::{ProductType, ProductTypeInput};

/// Repository for product type database operations.
pub struct ProductTypeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductTypeRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of product types ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<ProductType>, i64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product_type")
            .fetch_one(self.pool)
            .await?;
        let rows = sqlx::query_as::<_, ProductType>(
            "SELECT id, name, created_at FROM catalog.product_type ORDER BY name, id LIMIT $1 OFFSET $2",
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
    pub async fn get(&self, id: ProductTypeId) -> Result<Option<ProductType>, RepositoryError> {
        Ok(sqlx::query_as::<_, ProductType>(
            "SELECT id, name, created_at FROM catalog.product_type WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate name.
    pub async fn create(&self, input: &ProductTypeInput) -> Result<ProductType, RepositoryError> {
        sqlx::query_as::<_, ProductType>(
            "INSERT INTO catalog.product_type (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(input.name.as_deref().unwrap_or_default().trim())
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)
    }

    /// Rename a product type; an input without a name leaves it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product type does not exist.
    pub async fn update(
        &self,
        id: ProductTypeId,
        input: &ProductTypeInput,
    ) -> Result<ProductType, RepositoryError> {
        sqlx::query_as::<_, ProductType>(
            r"
            UPDATE catalog.product_type SET name = COALESCE($2, name)
            WHERE id = $1
            RETURNING id, name, created_at
            ",
        )
        .bind(id)
        .bind(input.name.as_deref().map(str::trim))
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product type; products keep existing without one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product type does not exist.
    pub async fn delete(&self, id: ProductTypeId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.product_type WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
