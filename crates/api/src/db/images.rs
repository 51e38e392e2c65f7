//! Product image rows. The files themselves live in media storage.

use std::collections::HashMap;

use emporium_core::{ImageId, ProductId};
use sqlx::PgPool;

use super::{RepositoryError, map_write_error};
use crate::models::ProductImage;

const IMAGE_COLUMNS: &str = "id, product_id, path, alt, position, created_at";

/// Repository for product image rows.
pub struct ImageRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ImageRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Images for a batch of products, grouped by product in position order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_products(
        &self,
        ids: &[i32],
    ) -> Result<HashMap<ProductId, Vec<ProductImage>>, RepositoryError> {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM catalog.product_image \
             WHERE product_id = ANY($1) ORDER BY position, id"
        );
        let rows = sqlx::query_as::<_, ProductImage>(&sql)
            .bind(ids)
            .fetch_all(self.pool)
            .await?;

        let mut grouped: HashMap<ProductId, Vec<ProductImage>> = HashMap::new();
        for image in rows {
            grouped.entry(image.product_id).or_default().push(image);
        }
        Ok(grouped)
    }

    /// Get one image of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<Option<ProductImage>, RepositoryError> {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM catalog.product_image WHERE id = $1 AND product_id = $2"
        );
        Ok(sqlx::query_as::<_, ProductImage>(&sql)
            .bind(image_id)
            .bind(product_id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Record an uploaded image at the end of the product's gallery.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the product does not exist.
    pub async fn insert(
        &self,
        product_id: ProductId,
        path: &str,
        alt: &str,
    ) -> Result<ProductImage, RepositoryError> {
        let sql = format!(
            r"
            INSERT INTO catalog.product_image (product_id, path, alt, position)
            VALUES ($1, $2, $3, (
                SELECT COALESCE(MAX(position) + 1, 0)
                FROM catalog.product_image WHERE product_id = $1
            ))
            RETURNING {IMAGE_COLUMNS}
            "
        );
        sqlx::query_as::<_, ProductImage>(&sql)
            .bind(product_id)
            .bind(path)
            .bind(alt)
            .fetch_one(self.pool)
            .await
            .map_err(map_write_error)
    }

    /// Delete an image row. Variants pointing at it are detached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such image exists.
    pub async fn delete(&self, product_id: ProductId, image_id: ImageId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM catalog.product_image WHERE id = $1 AND product_id = $2")
                .bind(image_id)
                .bind(product_id)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Storage paths of every image of the given products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn paths_for_products(&self, ids: &[i32]) -> Result<Vec<String>, RepositoryError> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT path FROM catalog.product_image WHERE product_id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?)
    }
}
