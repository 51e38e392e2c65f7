//! Supplier repository.

use emporium_core::SupplierId;
use emporium_core::catalog::PageRequest;
use sqlx::PgPool;
use tracing::instrument;

use super::{RepositoryError, map_write_error};
use crate::models::{Supplier, SupplierInput};

const SUPPLIER_COLUMNS: &str = "id, name, email, phone, website, address, created_at, updated_at";

/// Repository for supplier database operations.
pub struct SupplierRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SupplierRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of suppliers ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Supplier>, i64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.supplier")
            .fetch_one(self.pool)
            .await?;
        let sql = format!(
            "SELECT {SUPPLIER_COLUMNS} FROM catalog.supplier ORDER BY name, id LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, Supplier>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;
        Ok((rows, count))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let sql = format!("SELECT {SUPPLIER_COLUMNS} FROM catalog.supplier WHERE id = $1");
        Ok(sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate name.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &SupplierInput) -> Result<Supplier, RepositoryError> {
        let contact = input.contact.clone().normalized();
        let sql = format!(
            r"
            INSERT INTO catalog.supplier (name, email, phone, website, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SUPPLIER_COLUMNS}
            "
        );
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(input.name.as_deref().unwrap_or_default().trim())
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.website)
            .bind(contact.address)
            .fetch_one(self.pool)
            .await
            .map_err(map_write_error)
    }

    /// Replace a supplier's contact details; the name changes only when given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: SupplierId, input: &SupplierInput) -> Result<Supplier, RepositoryError> {
        let contact = input.contact.clone().normalized();
        let sql = format!(
            r"
            UPDATE catalog.supplier
            SET name = COALESCE($2, name), email = $3, phone = $4, website = $5, address = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING {SUPPLIER_COLUMNS}
            "
        );
        sqlx::query_as::<_, Supplier>(&sql)
            .bind(id)
            .bind(input.name.as_deref().map(str::trim))
            .bind(contact.email)
            .bind(contact.phone)
            .bind(contact.website)
            .bind(contact.address)
            .fetch_optional(self.pool)
            .await
            .map_err(map_write_error)?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a supplier; its products keep existing without one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the supplier does not exist.
    pub async fn delete(&self, id: SupplierId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.supplier WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
