//! Product and category translations.

use std::collections::HashMap;

use emporium_core::locale::{LanguageCode, fallback, fallback_opt};
use emporium_core::{CategoryId, ProductId};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use tracing::instrument;

use super::{RepositoryError, map_write_error};
use crate::models::{
    Category, CategoryTranslationInput, Product, ProductTranslationInput,
};

/// Translated product fields for one language.
#[derive(Debug, Clone, FromRow)]
pub struct ProductTranslation {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<Value>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
}

impl ProductTranslation {
    /// Overlay onto a product, keeping base values where the translation
    /// has none.
    pub fn apply(self, product: &mut Product) {
        product.name = fallback(std::mem::take(&mut product.name), self.name);
        product.summary = fallback_opt(product.summary.take(), self.summary);
        if let Some(description) = self.description.filter(|d| !d.is_null()) {
            product.description = Some(description);
        }
        product.meta_title = fallback_opt(product.meta_title.take(), self.meta_title);
        product.meta_description =
            fallback_opt(product.meta_description.take(), self.meta_description);
    }
}

/// Translated category fields for one language.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryTranslation {
    pub category_id: CategoryId,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CategoryTranslation {
    pub fn apply(self, category: &mut Category) {
        category.name = fallback(std::mem::take(&mut category.name), self.name);
        category.description = fallback_opt(category.description.take(), self.description);
    }
}

/// Repository for translation rows.
pub struct TranslationRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TranslationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Translations of `ids` into `language`, keyed by product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_products(
        &self,
        ids: &[i32],
        language: &LanguageCode,
    ) -> Result<HashMap<ProductId, ProductTranslation>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductTranslation>(
            r"
            SELECT product_id, name, summary, description, meta_title, meta_description
            FROM catalog.product_translation
            WHERE product_id = ANY($1) AND language_code = $2
            ",
        )
        .bind(ids)
        .bind(language.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|t| (t.product_id, t)).collect())
    }

    /// Translations of `ids` into `language`, keyed by category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_categories(
        &self,
        ids: &[i32],
        language: &LanguageCode,
    ) -> Result<HashMap<CategoryId, CategoryTranslation>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryTranslation>(
            r"
            SELECT category_id, name, description
            FROM catalog.category_translation
            WHERE category_id = ANY($1) AND language_code = $2
            ",
        )
        .bind(ids)
        .bind(language.as_str())
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|t| (t.category_id, t)).collect())
    }

    /// Overlay `language` translations onto `categories` in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn translate_categories(
        &self,
        categories: &mut [Category],
        language: Option<&LanguageCode>,
    ) -> Result<(), RepositoryError> {
        let Some(language) = language else {
            return Ok(());
        };
        let ids: Vec<i32> = categories.iter().map(|c| c.id.as_i32()).collect();
        let mut translations = self.for_categories(&ids, language).await?;
        for category in categories {
            if let Some(t) = translations.remove(&category.id) {
                t.apply(category);
            }
        }
        Ok(())
    }

    /// Create or replace a product translation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the product does not exist.
    #[instrument(skip(self, input), fields(language = %language))]
    pub async fn upsert_product(
        &self,
        product_id: ProductId,
        language: &LanguageCode,
        input: &ProductTranslationInput,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.product_translation
                (product_id, language_code, name, summary, description, meta_title, meta_description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (product_id, language_code) DO UPDATE SET
                name = EXCLUDED.name,
                summary = EXCLUDED.summary,
                description = EXCLUDED.description,
                meta_title = EXCLUDED.meta_title,
                meta_description = EXCLUDED.meta_description
            ",
        )
        .bind(product_id)
        .bind(language.as_str())
        .bind(input.name.as_deref())
        .bind(input.summary.as_deref())
        .bind(input.description.clone())
        .bind(input.meta_title.as_deref())
        .bind(input.meta_description.as_deref())
        .execute(self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }

    /// Create or replace a category translation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Invalid` if the category does not exist.
    #[instrument(skip(self, input), fields(language = %language))]
    pub async fn upsert_category(
        &self,
        category_id: CategoryId,
        language: &LanguageCode,
        input: &CategoryTranslationInput,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO catalog.category_translation (category_id, language_code, name, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (category_id, language_code) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description
            ",
        )
        .bind(category_id)
        .bind(language.as_str())
        .bind(input.name.as_deref())
        .bind(input.description.as_deref())
        .execute(self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use emporium_core::ProductStatus;
    use serde_json::json;

    fn product() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Linen Shirt".to_string(),
            summary: Some("Breathable".to_string()),
            description: Some(json!("Base")),
            brand: None,
            slug: "linen-shirt".to_string(),
            status: ProductStatus::Published,
            category_id: CategoryId::new(1),
            supplier_id: None,
            tax_class_id: None,
            product_type_id: None,
            default_variant_id: None,
            meta_title: None,
            meta_description: Some("Base meta".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_translation_overlays_present_fields() {
        let mut p = product();
        ProductTranslation {
            product_id: p.id,
            name: Some("Leinenhemd".to_string()),
            summary: Some("  ".to_string()),
            description: Some(Value::Null),
            meta_title: Some("Hemd".to_string()),
            meta_description: None,
        }
        .apply(&mut p);

        assert_eq!(p.name, "Leinenhemd");
        assert_eq!(p.summary.as_deref(), Some("Breathable"));
        assert_eq!(p.description, Some(json!("Base")));
        assert_eq!(p.meta_title.as_deref(), Some("Hemd"));
        assert_eq!(p.meta_description.as_deref(), Some("Base meta"));
    }
}
