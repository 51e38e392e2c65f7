//! Category repository.
//!
//! The tree is capped at two levels. Placement is checked inside the write
//! transaction against the stored ancestor chain of the proposed parent.

use emporium_core::catalog::{CategoryPlacement, PageRequest};
use emporium_core::locale::LanguageCode;
use emporium_core::{CategoryId, ValidationErrors};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::{RepositoryError, TranslationRepository, map_delete_error, map_write_error, unique_slug};
use crate::models::{Category, CategoryInput, CategoryPatch, clean};

const CATEGORY_COLUMNS: &str =
    "id, parent_id, name, slug, description, position, created_at, updated_at";

/// Ancestors beyond this are a corrupt tree, not a deep one.
const MAX_CHAIN: usize = 16;

/// The proposed parent followed by its ancestors, nearest first.
///
/// Each row is read `FOR SHARE`, so no ancestor can be re-parented until the
/// calling transaction ends.
async fn parent_chain(
    conn: &mut PgConnection,
    parent: Option<CategoryId>,
) -> Result<Vec<CategoryId>, RepositoryError> {
    let mut chain = Vec::new();
    let mut next = parent;
    while let Some(id) = next {
        if chain.len() >= MAX_CHAIN || chain.contains(&id) {
            return Err(RepositoryError::DataCorruption(format!(
                "category {id} has a cyclic or oversized ancestor chain"
            )));
        }
        let row: Option<Option<CategoryId>> = sqlx::query_scalar(
            "SELECT parent_id FROM catalog.category WHERE id = $1 FOR SHARE",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        let Some(parent_id) = row else {
            if chain.is_empty() {
                return Err(ValidationErrors::single("parent", "category does not exist").into());
            }
            return Err(RepositoryError::DataCorruption(format!(
                "category ancestor {id} is missing"
            )));
        };
        chain.push(id);
        next = parent_id;
    }
    Ok(chain)
}

async fn has_children(conn: &mut PgConnection, id: CategoryId) -> Result<bool, RepositoryError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM catalog.category WHERE parent_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *conn)
    .await?)
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of categories ordered by position then name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        page: PageRequest,
        parent: Option<CategoryId>,
        language: Option<&LanguageCode>,
    ) -> Result<(Vec<Category>, i64), RepositoryError> {
        let mut count_qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM catalog.category");
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new(format!("SELECT {CATEGORY_COLUMNS} FROM catalog.category"));
        if let Some(parent) = parent {
            count_qb.push(" WHERE parent_id = ").push_bind(parent);
            qb.push(" WHERE parent_id = ").push_bind(parent);
        }
        let count: i64 = count_qb.build_query_scalar().fetch_one(self.pool).await?;

        qb.push(" ORDER BY position, name, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let mut categories: Vec<Category> = qb.build_query_as().fetch_all(self.pool).await?;

        TranslationRepository::new(self.pool)
            .translate_categories(&mut categories, language)
            .await?;
        Ok((categories, count))
    }

    /// Every category, for building the tree.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn all(&self, language: Option<&LanguageCode>) -> Result<Vec<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM catalog.category ORDER BY position, name, id");
        let mut categories = sqlx::query_as::<_, Category>(&sql)
            .fetch_all(self.pool)
            .await?;
        TranslationRepository::new(self.pool)
            .translate_categories(&mut categories, language)
            .await?;
        Ok(categories)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        id: CategoryId,
        language: Option<&LanguageCode>,
    ) -> Result<Option<Category>, RepositoryError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM catalog.category WHERE id = $1");
        let Some(category) = sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        else {
            return Ok(None);
        };
        let mut one = [category];
        TranslationRepository::new(self.pool)
            .translate_categories(&mut one, language)
            .await?;
        let [category] = one;
        Ok(Some(category))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` when the placement would exceed
    /// the depth cap or the parent does not exist.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        CategoryPlacement {
            category: None,
            parent_chain: parent_chain(&mut tx, input.parent_id).await?,
            has_children: false,
        }
        .check()?;

        let slug = unique_slug(
            &mut *tx,
            "catalog.category",
            input.slug.as_deref(),
            &input.name,
            "category",
            None,
        )
        .await?;
        let sql = format!(
            r"
            INSERT INTO catalog.category (parent_id, name, slug, description, position)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CATEGORY_COLUMNS}
            "
        );
        let category = sqlx::query_as::<_, Category>(&sql)
            .bind(input.parent_id)
            .bind(input.name.trim())
            .bind(&slug)
            .bind(clean(input.description.clone()))
            .bind(input.position)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;

        tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    /// Apply a partial update. Moving a category re-checks its placement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Invalid` for a rejected placement.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: CategoryId, patch: &CategoryPatch) -> Result<Category, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let current: Option<String> =
            sqlx::query_scalar("SELECT name FROM catalog.category WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current_name = current.ok_or(RepositoryError::NotFound)?;

        if let Some(parent) = patch.parent_id {
            CategoryPlacement {
                category: Some(id),
                parent_chain: parent_chain(&mut tx, parent).await?,
                has_children: has_children(&mut tx, id).await?,
            }
            .check()?;
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE catalog.category SET updated_at = now()");
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(requested) = &patch.slug {
            let name = patch.name.as_deref().unwrap_or(&current_name);
            let slug = unique_slug(
                &mut *tx,
                "catalog.category",
                Some(requested),
                name,
                "category",
                Some(id.as_i32()),
            )
            .await?;
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(parent) = patch.parent_id {
            qb.push(", parent_id = ").push_bind(parent);
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(clean(description.clone()));
        }
        if let Some(position) = patch.position {
            qb.push(", position = ").push_bind(position);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {CATEGORY_COLUMNS}"));
        let category: Category = qb
            .build_query_as()
            .fetch_one(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await?;
        Ok(category)
    }

    /// Delete a category with no products and no subcategories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist and
    /// `RepositoryError::Protected` while anything still references it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM catalog.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_delete_error(e, "category"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Total number of categories.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM catalog.category")
            .fetch_one(self.pool)
            .await?)
    }
}
