//! Product repository.
//!
//! Listing returns ids only; the batched detail loader turns a list of ids
//! into full [`ProductRecord`]s with a fixed number of queries, whatever the
//! page size. Writes that touch variants keep the default-variant invariant
//! inside one transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use emporium_core::catalog::ranking::RECOMMENDATION_LIMIT;
use emporium_core::catalog::{PageRequest, ProductOrdering, order_by_ranking, validate_variant_batch};
use emporium_core::locale::LanguageCode;
use emporium_core::{
    CategoryId, CollectionId, CurrencyCode, ProductId, ProductStatus, ProductTypeId, SupplierId,
    TagId, TaxClassId, ValidationErrors, VariantId,
};
use serde_json::Value;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::variants::{VARIANT_COLUMNS, VariantRow, insert_variants, lock_product, set_default};
use super::{
    ImageRepository, RepositoryError, TranslationRepository, map_delete_error, map_write_error,
    parse_status, unique_slug,
};
use crate::models::{Product, ProductInput, ProductPatch, ProductRecord, Variant, clean};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.summary, p.description, p.brand, p.slug, \
     p.status::text AS status, p.category_id, p.supplier_id, p.tax_class_id, p.product_type_id, \
     p.default_variant_id, p.meta_title, p.meta_description, p.created_at, p.updated_at";

/// Listing filters. Unset fields do not constrain the result.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Restrict to published products regardless of `status`.
    pub published_only: bool,
    pub status: Option<ProductStatus>,
    /// Matches the category and its direct children.
    pub category: Option<CategoryId>,
    pub collection: Option<CollectionId>,
    pub tag: Option<TagId>,
    pub supplier: Option<SupplierId>,
    /// Case-insensitive exact match.
    pub brand: Option<String>,
    /// Substring of name, brand, or any variant SKU.
    pub search: Option<String>,
    pub ordering: ProductOrdering,
}

#[derive(Debug, FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    summary: Option<String>,
    description: Option<Value>,
    brand: Option<String>,
    slug: String,
    status: String,
    category_id: CategoryId,
    supplier_id: Option<SupplierId>,
    tax_class_id: Option<TaxClassId>,
    product_type_id: Option<ProductTypeId>,
    default_variant_id: Option<VariantId>,
    meta_title: Option<String>,
    meta_description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProductRow {
    fn into_product(self) -> Result<Product, RepositoryError> {
        Ok(Product {
            id: self.id,
            name: self.name,
            summary: self.summary,
            description: self.description,
            brand: self.brand,
            slug: self.slug,
            status: parse_status(&self.status)?,
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            tax_class_id: self.tax_class_id,
            product_type_id: self.product_type_id,
            default_variant_id: self.default_variant_id,
            meta_title: self.meta_title,
            meta_description: self.meta_description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Escape `LIKE` wildcards and wrap the term for a substring match.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if filter.published_only {
        qb.push(" AND p.status = 'published'");
    } else if let Some(status) = filter.status {
        qb.push(" AND p.status = ")
            .push_bind(status.to_string())
            .push("::catalog.product_status");
    }
    if let Some(category) = filter.category {
        qb.push(" AND p.category_id IN (SELECT id FROM catalog.category WHERE id = ")
            .push_bind(category)
            .push(" OR parent_id = ")
            .push_bind(category)
            .push(")");
    }
    if let Some(collection) = filter.collection {
        qb.push(
            " AND EXISTS (SELECT 1 FROM catalog.product_collection pc \
             WHERE pc.product_id = p.id AND pc.collection_id = ",
        )
        .push_bind(collection)
        .push(")");
    }
    if let Some(tag) = filter.tag {
        qb.push(
            " AND EXISTS (SELECT 1 FROM catalog.product_tag pt \
             WHERE pt.product_id = p.id AND pt.tag_id = ",
        )
        .push_bind(tag)
        .push(")");
    }
    if let Some(supplier) = filter.supplier {
        qb.push(" AND p.supplier_id = ").push_bind(supplier);
    }
    if let Some(brand) = filter.brand.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        qb.push(" AND lower(p.brand) = lower(")
            .push_bind(brand.to_string())
            .push(")");
    }
    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(term);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.summary ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.brand ILIKE ")
            .push_bind(pattern.clone())
            .push(
                " OR EXISTS (SELECT 1 FROM catalog.product_variant sv \
                 WHERE sv.product_id = p.id AND sv.sku ILIKE ",
            )
            .push_bind(pattern)
            .push("))");
    }
}

/// Replace the collection, tag, and related-product links that are `Some`.
async fn replace_links(
    conn: &mut PgConnection,
    product_id: ProductId,
    collections: Option<&[CollectionId]>,
    tags: Option<&[TagId]>,
    related: Option<&[ProductId]>,
) -> Result<(), RepositoryError> {
    if let Some(ids) = related
        && ids.contains(&product_id)
    {
        return Err(ValidationErrors::single("related", "a product cannot be related to itself").into());
    }

    let links: [(&str, &str, Option<Vec<i32>>); 3] = [
        (
            "catalog.product_collection",
            "collection_id",
            collections.map(|ids| ids.iter().map(CollectionId::as_i32).collect()),
        ),
        (
            "catalog.product_tag",
            "tag_id",
            tags.map(|ids| ids.iter().map(TagId::as_i32).collect()),
        ),
        (
            "catalog.product_related",
            "related_id",
            related.map(|ids| ids.iter().map(ProductId::as_i32).collect()),
        ),
    ];

    for (table, column, ids) in links {
        let Some(ids) = ids else { continue };
        sqlx::query(&format!("DELETE FROM {table} WHERE product_id = $1"))
            .bind(product_id)
            .execute(&mut *conn)
            .await?;
        if ids.is_empty() {
            continue;
        }
        sqlx::query(&format!(
            "INSERT INTO {table} (product_id, {column}) \
             SELECT $1, unnest($2::int[]) ON CONFLICT DO NOTHING"
        ))
        .bind(product_id)
        .bind(&ids)
        .execute(&mut *conn)
        .await
        .map_err(map_write_error)?;
    }
    Ok(())
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of product ids matching `filter`, plus the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        filter: &ProductFilter,
        page: PageRequest,
    ) -> Result<(Vec<ProductId>, i64), RepositoryError> {
        self.list_range(filter, page.offset(), page.limit()).await
    }

    /// Number of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_matching(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM catalog.product p");
        push_filters(&mut qb, filter);
        Ok(qb.build_query_scalar().fetch_one(self.pool).await?)
    }

    /// Up to `limit` product ids matching `filter` starting at `offset`, plus
    /// the total match count.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_range(
        &self,
        filter: &ProductFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<ProductId>, i64), RepositoryError> {
        let count = self.count_matching(filter).await?;

        let mut qb = QueryBuilder::new(
            "SELECT p.id FROM catalog.product p \
             LEFT JOIN catalog.product_variant dv ON dv.id = p.default_variant_id",
        );
        push_filters(&mut qb, filter);
        qb.push(" ORDER BY ")
            .push(filter.ordering.sql())
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let ids: Vec<ProductId> = qb.build_query_scalar().fetch_all(self.pool).await?;

        Ok((ids, count))
    }

    /// Load full records for `ids`, returned in the same order.
    ///
    /// `language` is the translation to overlay; pass `None` for the default
    /// language. Missing ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails and
    /// `RepositoryError::DataCorruption` for unparseable stored values.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn load(
        &self,
        ids: &[ProductId],
        language: Option<&LanguageCode>,
    ) -> Result<Vec<ProductRecord>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();

        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM catalog.product p WHERE p.id = ANY($1)");
        let products = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&raw_ids)
            .fetch_all(self.pool)
            .await?;

        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant v \
             JOIN catalog.product p ON p.id = v.product_id \
             WHERE v.product_id = ANY($1) ORDER BY v.position, v.id"
        );
        let mut variants: HashMap<ProductId, Vec<Variant>> = HashMap::new();
        for row in sqlx::query_as::<_, VariantRow>(&sql)
            .bind(&raw_ids)
            .fetch_all(self.pool)
            .await?
        {
            let variant = row.into_variant()?;
            variants.entry(variant.product_id).or_default().push(variant);
        }

        let mut images = ImageRepository::new(self.pool).for_products(&raw_ids).await?;
        let mut collections = self
            .links::<CollectionId>("catalog.product_collection", "collection_id", &raw_ids)
            .await?;
        let mut tags = self
            .links::<TagId>("catalog.product_tag", "tag_id", &raw_ids)
            .await?;
        let mut related = self
            .links::<ProductId>("catalog.product_related", "related_id", &raw_ids)
            .await?;
        let mut translations = match language {
            Some(language) => {
                TranslationRepository::new(self.pool)
                    .for_products(&raw_ids, language)
                    .await?
            }
            None => HashMap::new(),
        };

        let mut records = Vec::with_capacity(products.len());
        for row in products {
            let mut product = row.into_product()?;
            let id = product.id;
            if let Some(translation) = translations.remove(&id) {
                translation.apply(&mut product);
            }
            records.push(ProductRecord {
                product,
                variants: variants.remove(&id).unwrap_or_default(),
                images: images.remove(&id).unwrap_or_default(),
                collection_ids: collections.remove(&id).unwrap_or_default(),
                tag_ids: tags.remove(&id).unwrap_or_default(),
                related_ids: related.remove(&id).unwrap_or_default(),
            });
        }

        Ok(order_by_ranking(records, ids, |r| r.product.id))
    }

    async fn links<T>(
        &self,
        table: &str,
        column: &str,
        ids: &[i32],
    ) -> Result<HashMap<ProductId, Vec<T>>, RepositoryError>
    where
        T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres> + Send + Unpin,
    {
        let sql = format!(
            "SELECT product_id, {column} FROM {table} WHERE product_id = ANY($1) ORDER BY {column}"
        );
        let rows: Vec<(ProductId, T)> = sqlx::query_as(&sql).bind(ids).fetch_all(self.pool).await?;
        let mut grouped: HashMap<ProductId, Vec<T>> = HashMap::new();
        for (product_id, linked) in rows {
            grouped.entry(product_id).or_default().push(linked);
        }
        Ok(grouped)
    }

    /// Load one product.
    ///
    /// # Errors
    ///
    /// See [`Self::load`].
    pub async fn get(
        &self,
        id: ProductId,
        language: Option<&LanguageCode>,
    ) -> Result<Option<ProductRecord>, RepositoryError> {
        Ok(self.load(&[id], language).await?.pop())
    }

    /// Resolve a slug to a product id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn id_by_slug(&self, slug: &str) -> Result<Option<ProductId>, RepositoryError> {
        Ok(
            sqlx::query_scalar::<_, ProductId>("SELECT id FROM catalog.product WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool)
                .await?,
        )
    }

    /// Total number of products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM catalog.product")
            .fetch_one(self.pool)
            .await?)
    }

    /// Published products whose names are most similar to this product's,
    /// best match first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn recommendations(&self, id: ProductId) -> Result<Vec<ProductId>, RepositoryError> {
        let limit = i64::try_from(RECOMMENDATION_LIMIT).unwrap_or(i64::MAX);
        Ok(sqlx::query_scalar::<_, ProductId>(
            r"
            SELECT p.id
            FROM catalog.product p
            JOIN catalog.product src ON src.id = $1
            WHERE p.id <> src.id
              AND p.status = 'published'
              AND similarity(p.name, src.name) > 0
            ORDER BY similarity(p.name, src.name) DESC, p.id
            LIMIT $2
            ",
        )
        .bind(id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?)
    }

    /// Create a product with its variants in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` when the variant batch breaks the
    /// default-variant rules or references are missing, and
    /// `RepositoryError::Conflict` for duplicate SKUs or slugs.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        input: &ProductInput,
        base: CurrencyCode,
    ) -> Result<ProductId, RepositoryError> {
        let default_index = validate_variant_batch(&input.variants, base, false)?;

        let mut tx = self.pool.begin().await?;
        let slug = unique_slug(
            &mut *tx,
            "catalog.product",
            input.slug.as_deref(),
            &input.name,
            "product",
            None,
        )
        .await?;

        let id: ProductId = sqlx::query_scalar(
            r"
            INSERT INTO catalog.product
                (name, summary, description, brand, slug, status, category_id, supplier_id,
                 tax_class_id, product_type_id, meta_title, meta_description)
            VALUES ($1, $2, $3, $4, $5, $6::catalog.product_status, $7, $8, $9, $10, $11, $12)
            RETURNING id
            ",
        )
        .bind(input.name.trim())
        .bind(input.effective_summary())
        .bind(input.description.clone().filter(|d| !d.is_null()))
        .bind(clean(input.brand.clone()))
        .bind(&slug)
        .bind(input.status.to_string())
        .bind(input.category_id)
        .bind(input.supplier_id)
        .bind(input.tax_class_id)
        .bind(input.product_type_id)
        .bind(clean(input.meta_title.clone()))
        .bind(clean(input.meta_description.clone()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let variant_ids = insert_variants(&mut tx, id, &input.variants, base).await?;
        if let Some(default_id) = default_index.and_then(|i| variant_ids.get(i)) {
            set_default(&mut tx, id, *default_id).await?;
        }
        replace_links(
            &mut tx,
            id,
            Some(input.collections.as_slice()),
            Some(input.tags.as_slice()),
            Some(input.related.as_slice()),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, slug = %slug, variants = variant_ids.len(), "Product created");
        Ok(id)
    }

    /// Apply a partial update, appending any variants in the patch.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist, and
    /// the same errors as [`Self::create`] otherwise.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        base: CurrencyCode,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let current_default = lock_product(&mut tx, id).await?;
        let default_index = if patch.variants.is_empty() {
            None
        } else {
            validate_variant_batch(&patch.variants, base, current_default.is_some())?
        };

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE catalog.product SET updated_at = now()");
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(requested) = &patch.slug {
            let slug = unique_slug(
                &mut *tx,
                "catalog.product",
                Some(requested),
                patch.name.as_deref().unwrap_or_default(),
                "product",
                Some(id.as_i32()),
            )
            .await?;
            qb.push(", slug = ").push_bind(slug);
        }
        if let Some(summary) = &patch.summary {
            qb.push(", summary = ").push_bind(clean(summary.clone()));
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ")
                .push_bind(description.clone().filter(|d| !d.is_null()));
        }
        if let Some(brand) = &patch.brand {
            qb.push(", brand = ").push_bind(clean(brand.clone()));
        }
        if let Some(status) = patch.status {
            qb.push(", status = ")
                .push_bind(status.to_string())
                .push("::catalog.product_status");
        }
        if let Some(category) = patch.category_id {
            qb.push(", category_id = ").push_bind(category);
        }
        if let Some(supplier) = patch.supplier_id {
            qb.push(", supplier_id = ").push_bind(supplier);
        }
        if let Some(tax_class) = patch.tax_class_id {
            qb.push(", tax_class_id = ").push_bind(tax_class);
        }
        if let Some(product_type) = patch.product_type_id {
            qb.push(", product_type_id = ").push_bind(product_type);
        }
        if let Some(meta_title) = &patch.meta_title {
            qb.push(", meta_title = ").push_bind(clean(meta_title.clone()));
        }
        if let Some(meta_description) = &patch.meta_description {
            qb.push(", meta_description = ")
                .push_bind(clean(meta_description.clone()));
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

        if !patch.variants.is_empty() {
            let variant_ids = insert_variants(&mut tx, id, &patch.variants, base).await?;
            if let Some(default_id) = default_index.and_then(|i| variant_ids.get(i)) {
                set_default(&mut tx, id, *default_id).await?;
            }
        }
        replace_links(
            &mut tx,
            id,
            patch.collections.as_deref(),
            patch.tags.as_deref(),
            patch.related.as_deref(),
        )
        .await?;
        tx.commit().await?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(())
    }

    /// Change the status of one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn set_status(&self, id: ProductId, status: ProductStatus) -> Result<(), RepositoryError> {
        let changed = self.bulk_set_status(&[id], status).await?;
        if changed == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a product, its variants, and its links.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        if self.bulk_delete(&[id]).await? == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set the status of every listed product; returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_set_status(
        &self,
        ids: &[ProductId],
        status: ProductStatus,
    ) -> Result<u64, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            UPDATE catalog.product
            SET status = $2::catalog.product_status, updated_at = now()
            WHERE id = ANY($1)
            ",
        )
        .bind(&raw_ids)
        .bind(status.to_string())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Delete every listed product in one transaction; returns how many were
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Protected` if another row still references
    /// one of the products.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn bulk_delete(&self, ids: &[ProductId]) -> Result<u64, RepositoryError> {
        let raw_ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
        let mut tx = self.pool.begin().await?;
        // The default variant is protected while referenced; release it first.
        sqlx::query("UPDATE catalog.product SET default_variant_id = NULL WHERE id = ANY($1)")
            .bind(&raw_ids)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM catalog.product WHERE id = ANY($1)")
            .bind(&raw_ids)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_delete_error(e, "product"))?;
        tx.commit().await?;

        tracing::info!(deleted = result.rows_affected(), "Products deleted");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("shirt"), "%shirt%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_filters_bind_only_set_fields() {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT p.id FROM catalog.product p");
        push_filters(
            &mut qb,
            &ProductFilter {
                published_only: true,
                status: Some(ProductStatus::Draft),
                brand: Some("  ".to_string()),
                tag: Some(TagId::new(4)),
                ..ProductFilter::default()
            },
        );
        let sql = qb.sql();
        assert!(sql.contains("p.status = 'published'"));
        assert!(!sql.contains("::catalog.product_status"));
        assert!(!sql.contains("lower(p.brand)"));
        assert!(sql.contains("pt.tag_id = $1"));
    }
}
