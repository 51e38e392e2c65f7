//! Tag repository.

use emporium_core::TagId;
use emporium_core::catalog::PageRequest;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{RepositoryError, map_write_error, unique_slug};
use crate::models::{Tag, TagInput};

const TAG_COLUMNS: &str = "id, name, slug, created_at";

/// Repository for tag database operations.
pub struct TagRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TagRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<(Vec<Tag>, i64), RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog.tag")
            .fetch_one(self.pool)
            .await?;
        let sql = format!("SELECT {TAG_COLUMNS} FROM catalog.tag ORDER BY name, id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, Tag>(&sql)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.pool)
            .await?;
        Ok((rows, count))
    }

    /// Tags with the given ids, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>, RepositoryError> {
        let raw: Vec<i32> = ids.iter().map(TagId::as_i32).collect();
        let sql = format!("SELECT {TAG_COLUMNS} FROM catalog.tag WHERE id = ANY($1) ORDER BY name, id");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(&raw)
            .fetch_all(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: TagId) -> Result<Option<Tag>, RepositoryError> {
        let sql = format!("SELECT {TAG_COLUMNS} FROM catalog.tag WHERE id = $1");
        Ok(sqlx::query_as::<_, Tag>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` for a duplicate slug.
    pub async fn create(&self, input: &TagInput) -> Result<Tag, RepositoryError> {
        let name = input.name.as_deref().unwrap_or_default().trim();
        let mut tx = self.pool.begin().await?;
        let slug = unique_slug(&mut *tx, "catalog.tag", input.slug.as_deref(), name, "tag", None).await?;
        let sql = format!("INSERT INTO catalog.tag (name, slug) VALUES ($1, $2) RETURNING {TAG_COLUMNS}");
        let tag = sqlx::query_as::<_, Tag>(&sql)
            .bind(name)
            .bind(&slug)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(tag)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag does not exist.
    pub async fn update(&self, id: TagId, input: &TagInput) -> Result<Tag, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("UPDATE catalog.tag SET id = id");
        if let Some(name) = &input.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(requested) = &input.slug {
            let slug = unique_slug(
                &mut *tx,
                "catalog.tag",
                Some(requested),
                input.name.as_deref().unwrap_or_default(),
                "tag",
                Some(id.as_i32()),
            )
            .await?;
            qb.push(", slug = ").push_bind(slug);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {TAG_COLUMNS}"));
        let tag: Option<Tag> = qb
            .build_query_as()
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        tag.ok_or(RepositoryError::NotFound)
    }

    /// Delete a tag; products lose it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the tag does not exist.
    pub async fn delete(&self, id: TagId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.tag WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
