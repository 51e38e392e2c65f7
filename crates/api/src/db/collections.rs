//! Collection repository.

use emporium_core::CollectionId;
use emporium_core::catalog::PageRequest;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::{RepositoryError, map_write_error, unique_slug};
use crate::models::{Collection, CollectionInput, clean};

const COLLECTION_COLUMNS: &str = "id, name, slug, description, created_at, updated_at";

/// Repository for collection database operations.
pub struct CollectionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CollectionRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of collections ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Collection>, i64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.collection")
            .fetch_one(self.pool)
            .await?;
        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM catalog.collection ORDER BY name, id LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, Collection>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;
        Ok((rows, count))
    }

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CollectionId) -> Result<Option<Collection>, RepositoryError> {
        let sql = format!("SELECT {COLLECTION_COLUMNS} FROM catalog.collection WHERE id = $1");
        Ok(sqlx::query_as::<_, Collection>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// Create a collection; the slug is derived from the name unless given.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate slug.
    #[instrument(skip(self, input))]
    pub async fn create(&self, input: &CollectionInput) -> Result<Collection, RepositoryError> {
        let name = input.name.as_deref().unwrap_or_default().trim();
        let mut tx = self.pool.begin().await?;
        let slug = unique_slug(
            &mut *tx,
            "catalog.collection",
            input.slug.as_deref(),
            name,
            "collection",
            None,
        )
        .await?;
        let sql = format!(
            "INSERT INTO catalog.collection (name, slug, description) VALUES ($1, $2, $3) \
             RETURNING {COLLECTION_COLUMNS}"
        );
        let collection = sqlx::query_as::<_, Collection>(&sql)
            .bind(name)
            .bind(&slug)
            .bind(clean(input.description.clone().flatten()))
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(collection)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection does not exist.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: CollectionId,
        input: &CollectionInput,
    ) -> Result<Collection, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE catalog.collection SET updated_at = now()");
        if let Some(name) = &input.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(requested) = &input.slug {
            let slug = unique_slug(
                &mut *tx,
                "catalog.collection",
                Some(requested),
                input.name.as_deref().unwrap_or_default(),
                "collection",
                Some(id.as_i32()),
            )
            .await?;
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(description) = &input.description {
            qb.push(", description = ").push_bind(clean(description.clone()));
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {COLLECTION_COLUMNS}"));
        let collection: Option<Collection> = qb
            .build_query_as()
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        collection.ok_or(RepositoryError::NotFound)
    }

    /// Delete a collection. Products are detached, not deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the collection does not exist.
    pub async fn delete(&self, id: CollectionId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.collection WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Collections with the given ids, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[CollectionId]) -> Result<Vec<Collection>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(CollectionId::as_i32).collect();
        let sql = format!(
            "SELECT {COLLECTION_COLUMNS} FROM catalog.collection WHERE id = ANY($1) ORDER BY name, id"
        );
        Ok(sqlx::query_as::<_, Collection>(&sql)
            .bind(&raw)
            .fetch_all(self.pool)
            .await?)
    }
}
