//! Variant repository.
//!
//! Every write that can change which variant is the default locks the owning
//! product row first, so concurrent edits of the same product serialize.

use chrono::{DateTime, Utc};
use emporium_core::catalog::variants::{check_variant_deletable, validate_amount};
use emporium_core::catalog::{VariantDraft, VariantPatch, validate_variant_batch};
use emporium_core::{CurrencyCode, ImageId, ProductId, ValidationErrors, VariantId};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::{RepositoryError, map_delete_error, map_write_error, parse_currency};
use crate::models::Variant;

/// Select list for [`VariantRow`]; expects `v` (variant) and `p` (product).
pub(crate) const VARIANT_COLUMNS: &str = "v.id, v.product_id, v.name, v.sku, v.price, v.cost, \
     v.compare_at_price, v.currency, v.weight_grams, v.track_inventory, v.allow_backorder, \
     v.quantity, v.image_id, v.position, \
     COALESCE(p.default_variant_id = v.id, FALSE) AS is_default, v.created_at, v.updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct VariantRow {
    id: VariantId,
    product_id: ProductId,
    name: String,
    sku: Option<String>,
    price: Decimal,
    cost: Decimal,
    compare_at_price: Option<Decimal>,
    currency: String,
    weight_grams: Option<i32>,
    track_inventory: bool,
    allow_backorder: bool,
    quantity: i32,
    image_id: Option<ImageId>,
    position: i32,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VariantRow {
    pub(crate) fn into_variant(self) -> Result<Variant, RepositoryError> {
        Ok(Variant {
            id: self.id,
            product_id: self.product_id,
            name: self.name,
            sku: self.sku,
            price: self.price,
            cost: self.cost,
            compare_at_price: self.compare_at_price,
            currency: parse_currency(&self.currency)?,
            weight_grams: self.weight_grams,
            track_inventory: self.track_inventory,
            allow_backorder: self.allow_backorder,
            quantity: self.quantity,
            image_id: self.image_id,
            position: self.position,
            is_default: self.is_default,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Reject an image that is not one of the product's own images.
async fn check_image_owner(
    conn: &mut PgConnection,
    product_id: ProductId,
    image_id: ImageId,
    field: &str,
) -> Result<(), RepositoryError> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM catalog.product_image WHERE id = $1 AND product_id = $2)",
    )
    .bind(image_id)
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;
    if owned {
        Ok(())
    } else {
        Err(ValidationErrors::single(field, format!("image {image_id} does not belong to this product")).into())
    }
}

/// Insert `drafts` for a product, appended after its existing variants.
pub(crate) async fn insert_variants(
    conn: &mut PgConnection,
    product_id: ProductId,
    drafts: &[VariantDraft],
    base: CurrencyCode,
) -> Result<Vec<VariantId>, RepositoryError> {
    let mut position: i32 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM catalog.product_variant WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    let mut ids = Vec::with_capacity(drafts.len());
    for (i, draft) in drafts.iter().enumerate() {
        if let Some(image_id) = draft.image_id {
            check_image_owner(conn, product_id, image_id, &format!("variants[{i}].image_id"))
                .await?;
        }
        let id: VariantId = sqlx::query_scalar(
            r"
            INSERT INTO catalog.product_variant
                (product_id, name, sku, price, cost, compare_at_price, currency,
                 weight_grams, track_inventory, allow_backorder, quantity, image_id, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            ",
        )
        .bind(product_id)
        .bind(draft.name.trim())
        .bind(draft.normalized_sku())
        .bind(draft.price)
        .bind(draft.cost)
        .bind(draft.compare_at_price)
        .bind(draft.currency_or(base).code())
        .bind(draft.weight_grams)
        .bind(draft.track_inventory)
        .bind(draft.allow_backorder)
        .bind(draft.quantity)
        .bind(draft.image_id)
        .bind(position)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_write_error)?;
        ids.push(id);
        position += 1;
    }
    Ok(ids)
}

/// Point a product at its new default variant.
pub(crate) async fn set_default(
    conn: &mut PgConnection,
    product_id: ProductId,
    variant_id: VariantId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE catalog.product SET default_variant_id = $2, updated_at = now() WHERE id = $1",
    )
    .bind(product_id)
    .bind(variant_id)
    .execute(&mut *conn)
    .await
    .map_err(map_write_error)?;
    Ok(())
}

/// Lock a product row and return its current default variant.
pub(crate) async fn lock_product(
    conn: &mut PgConnection,
    product_id: ProductId,
) -> Result<Option<VariantId>, RepositoryError> {
    let row: Option<(Option<VariantId>,)> = sqlx::query_as(
        "SELECT default_variant_id FROM catalog.product WHERE id = $1 FOR UPDATE",
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.map(|(default,)| default).ok_or(RepositoryError::NotFound)
}

/// Repository for variant database operations.
pub struct VariantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VariantRepository<'a> {
    /// Create a new variant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a variant by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn get(&self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant v \
             JOIN catalog.product p ON p.id = v.product_id WHERE v.id = $1"
        );
        sqlx::query_as::<_, VariantRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .map(VariantRow::into_variant)
            .transpose()
    }

    /// Add variants to an existing product.
    ///
    /// The batch may omit a default only when the product already has one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist,
    /// `RepositoryError::Invalid` for batch problems, and
    /// `RepositoryError::Conflict` for SKUs already in use.
    #[instrument(skip(self, drafts), fields(count = drafts.len()))]
    pub async fn add(
        &self,
        product_id: ProductId,
        drafts: &[VariantDraft],
        base: CurrencyCode,
    ) -> Result<Vec<VariantId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let current_default = lock_product(&mut tx, product_id).await?;
        if drafts.is_empty() {
            return Err(ValidationErrors::single("variants", "at least one variant is required").into());
        }
        let default_index = validate_variant_batch(drafts, base, current_default.is_some())?;

        let ids = insert_variants(&mut tx, product_id, drafts, base).await?;
        if let Some(default_id) = default_index.and_then(|i| ids.get(i)) {
            set_default(&mut tx, product_id, *default_id).await?;
        }
        tx.commit().await?;

        tracing::info!(product_id = %product_id, count = ids.len(), "Variants added");
        Ok(ids)
    }

    /// Apply a partial update to a variant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist,
    /// `RepositoryError::Invalid` for invalid fields, and
    /// `RepositoryError::Conflict` for a SKU already in use.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: VariantId,
        patch: &VariantPatch,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM catalog.product_variant v \
             JOIN catalog.product p ON p.id = v.product_id WHERE v.id = $1 FOR UPDATE OF v, p"
        );
        let current = sqlx::query_as::<_, VariantRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?
            .into_variant()?;

        let currency = patch.currency.unwrap_or(current.currency);
        let mut errors = patch.validate(currency);
        if patch.currency.is_some_and(|c| c != current.currency) {
            // Stored amounts must still fit the new currency's precision.
            for (field, patched, stored) in [
                ("price", patch.price.is_some(), Some(current.price)),
                ("cost", patch.cost.is_some(), Some(current.cost)),
                ("compare_at_price", patch.compare_at_price.is_some(), current.compare_at_price),
            ] {
                if let (false, Some(amount)) = (patched, stored) {
                    validate_amount(field, amount, currency, &mut errors);
                }
            }
        }
        errors.into_result()?;
        if let Some(Some(image_id)) = patch.image_id {
            check_image_owner(&mut tx, current.product_id, image_id, "image_id").await?;
        }

        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("UPDATE catalog.product_variant SET updated_at = now()");
        if let Some(name) = &patch.name {
            qb.push(", name = ").push_bind(name.trim().to_string());
        }
        if let Some(sku) = &patch.sku {
            let sku = Some(sku.trim().to_string()).filter(|s| !s.is_empty());
            qb.push(", sku = ").push_bind(sku);
        }
        if let Some(price) = patch.price {
            qb.push(", price = ").push_bind(price);
        }
        if let Some(cost) = patch.cost {
            qb.push(", cost = ").push_bind(cost);
        }
        if let Some(compare_at) = patch.compare_at_price {
            qb.push(", compare_at_price = ").push_bind(compare_at);
        }
        if let Some(image_id) = patch.image_id {
            qb.push(", image_id = ").push_bind(image_id);
        }
        if let Some(currency) = patch.currency {
            qb.push(", currency = ").push_bind(currency.code());
        }
        if let Some(weight) = patch.weight_grams {
            qb.push(", weight_grams = ").push_bind(weight);
        }
        if let Some(track) = patch.track_inventory {
            qb.push(", track_inventory = ").push_bind(track);
        }
        if let Some(backorder) = patch.allow_backorder {
            qb.push(", allow_backorder = ").push_bind(backorder);
        }
        if let Some(quantity) = patch.quantity {
            qb.push(", quantity = ").push_bind(quantity);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;

        if patch.is_default == Some(true) && !current.is_default {
            set_default(&mut tx, current.product_id, id).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Delete a variant that is not its product's default.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the variant does not exist and
    /// `RepositoryError::Invalid` if it is the product's default variant.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: VariantId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let row: Option<(ProductId, Option<VariantId>)> = sqlx::query_as(
            r"
            SELECT v.product_id, p.default_variant_id
            FROM catalog.product_variant v
            JOIN catalog.product p ON p.id = v.product_id
            WHERE v.id = $1
            FOR UPDATE OF p
            ",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let (product_id, default_id) = row.ok_or(RepositoryError::NotFound)?;

        check_variant_deletable(default_id == Some(id))?;

        sqlx::query("DELETE FROM catalog.product_variant WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_delete_error(e, "variant"))?;
        tx.commit().await?;

        tracing::info!(variant_id = %id, product_id = %product_id, "Variant deleted");
        Ok(())
    }
}
