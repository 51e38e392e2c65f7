//! Product, variant, and image models.

use chrono::{DateTime, Utc};
use emporium_core::catalog::VariantDraft;
use emporium_core::richtext::{summarize, validate_document};
use emporium_core::{
    CategoryId, CollectionId, CurrencyCode, ImageId, Price, ProductId, ProductStatus,
    ProductTypeId, SupplierId, TagId, TaxClassId, ValidationErrors, VariantId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::double_option;

const MAX_NAME_LENGTH: usize = 255;
const MAX_SUMMARY_LENGTH: usize = 1000;
const MAX_BRAND_LENGTH: usize = 128;
const MAX_META_TITLE_LENGTH: usize = 255;
const MAX_META_DESCRIPTION_LENGTH: usize = 500;
/// Length of a summary derived from the description.
const DERIVED_SUMMARY_LENGTH: usize = 280;

/// A product with translatable fields already resolved for one language.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub summary: Option<String>,
    /// Rich-text document as stored.
    pub description: Option<Value>,
    pub brand: Option<String>,
    pub slug: String,
    pub status: ProductStatus,
    pub category_id: CategoryId,
    pub supplier_id: Option<SupplierId>,
    pub tax_class_id: Option<TaxClassId>,
    pub product_type_id: Option<ProductTypeId>,
    pub default_variant_id: Option<VariantId>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchasable configuration of a product.
#[derive(Debug, Clone, Serialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub currency: CurrencyCode,
    pub weight_grams: Option<i32>,
    pub track_inventory: bool,
    pub allow_backorder: bool,
    pub quantity: i32,
    pub image_id: Option<ImageId>,
    pub position: i32,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Variant {
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::new(self.price, self.currency)
    }

    #[must_use]
    pub fn compare_at(&self) -> Option<Price> {
        self.compare_at_price.map(|amount| Price::new(amount, self.currency))
    }
}

/// An image attached to a product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: ImageId,
    pub product_id: ProductId,
    /// Name in the media storage backend.
    pub path: String,
    pub alt: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    /// Public URL, filled in from the storage backend.
    #[sqlx(skip)]
    pub url: String,
}

/// Everything the detail loader gathers for one product.
#[derive(Debug, Clone)]
pub struct ProductRecord {
    pub product: Product,
    pub variants: Vec<Variant>,
    pub images: Vec<ProductImage>,
    pub collection_ids: Vec<CollectionId>,
    pub tag_ids: Vec<TagId>,
    pub related_ids: Vec<ProductId>,
}

impl ProductRecord {
    #[must_use]
    pub fn default_variant(&self) -> Option<&Variant> {
        self.variants.iter().find(|v| v.is_default)
    }
}

/// A price converted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceView {
    pub amount: Decimal,
    pub currency: CurrencyCode,
    pub formatted: String,
}

/// Variant as returned by the REST API.
#[derive(Debug, Clone, Serialize)]
pub struct VariantView {
    #[serde(flatten)]
    pub variant: Variant,
    pub display_price: PriceView,
    pub display_compare_at_price: Option<PriceView>,
}

/// Product as returned by the REST API.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub description_html: String,
    /// Default variant price in the request currency.
    pub price: Option<PriceView>,
    pub variants: Vec<VariantView>,
    pub images: Vec<ProductImage>,
    pub collections: Vec<CollectionId>,
    pub tags: Vec<TagId>,
    pub related: Vec<ProductId>,
}

/// Payload for `POST /api/products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub status: ProductStatus,
    pub category_id: CategoryId,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    #[serde(default)]
    pub tax_class_id: Option<TaxClassId>,
    #[serde(default)]
    pub product_type_id: Option<ProductTypeId>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
    #[serde(default)]
    pub collections: Vec<CollectionId>,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub related: Vec<ProductId>,
    #[serde(default)]
    pub variants: Vec<VariantDraft>,
}

impl ProductInput {
    /// Validate the product fields. Variants are checked by the repository,
    /// which knows whether a default already exists.
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_name(&self.name, &mut errors);
        validate_text_fields(
            self.summary.as_deref(),
            self.brand.as_deref(),
            self.meta_title.as_deref(),
            self.meta_description.as_deref(),
            &mut errors,
        );
        if let Some(doc) = &self.description {
            validate_description(doc, &mut errors);
        }
        errors
    }

    /// The given summary, or one derived from the description's text.
    #[must_use]
    pub fn effective_summary(&self) -> Option<String> {
        super::clean(self.summary.clone()).or_else(|| {
            self.description
                .as_ref()
                .filter(|doc| !doc.is_null())
                .map(|doc| summarize(doc, DERIVED_SUMMARY_LENGTH))
                .filter(|text| !text.is_empty())
        })
    }
}

/// Payload for `PATCH /api/products/{id}`.
///
/// Nullable fields distinguish "absent" from an explicit `null`, which clears
/// the value. `variants` are appended to the product.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub summary: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<Value>>,
    #[serde(default, deserialize_with = "double_option")]
    pub brand: Option<Option<String>>,
    pub status: Option<ProductStatus>,
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "double_option")]
    pub supplier_id: Option<Option<SupplierId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub tax_class_id: Option<Option<TaxClassId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub product_type_id: Option<Option<ProductTypeId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_title: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub meta_description: Option<Option<String>>,
    pub collections: Option<Vec<CollectionId>>,
    pub tags: Option<Vec<TagId>>,
    pub related: Option<Vec<ProductId>>,
    #[serde(default)]
    pub variants: Vec<VariantDraft>,
}

impl ProductPatch {
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            validate_name(name, &mut errors);
        }
        validate_text_fields(
            self.summary.as_ref().and_then(Option::as_deref),
            self.brand.as_ref().and_then(Option::as_deref),
            self.meta_title.as_ref().and_then(Option::as_deref),
            self.meta_description.as_ref().and_then(Option::as_deref),
            &mut errors,
        );
        if let Some(Some(doc)) = &self.description {
            validate_description(doc, &mut errors);
        }
        errors
    }
}

/// Payload for `PUT /api/products/{id}/translations/{lang}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductTranslationInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<Value>,
    #[serde(default)]
    pub meta_title: Option<String>,
    #[serde(default)]
    pub meta_description: Option<String>,
}

impl ProductTranslationInput {
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self
            .name
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NAME_LENGTH)
        {
            errors.add("name", format!("must be at most {MAX_NAME_LENGTH} characters"));
        }
        validate_text_fields(
            self.summary.as_deref(),
            None,
            self.meta_title.as_deref(),
            self.meta_description.as_deref(),
            &mut errors,
        );
        if let Some(doc) = &self.description {
            validate_description(doc, &mut errors);
        }
        errors
    }
}

fn validate_name(name: &str, errors: &mut ValidationErrors) {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.add("name", "this field may not be blank");
    } else if trimmed.chars().count() > MAX_NAME_LENGTH {
        errors.add("name", format!("must be at most {MAX_NAME_LENGTH} characters"));
    }
}

fn validate_text_fields(
    summary: Option<&str>,
    brand: Option<&str>,
    meta_title: Option<&str>,
    meta_description: Option<&str>,
    errors: &mut ValidationErrors,
) {
    for (field, value, max) in [
        ("summary", summary, MAX_SUMMARY_LENGTH),
        ("brand", brand, MAX_BRAND_LENGTH),
        ("meta_title", meta_title, MAX_META_TITLE_LENGTH),
        ("meta_description", meta_description, MAX_META_DESCRIPTION_LENGTH),
    ] {
        if value.is_some_and(|v| v.chars().count() > max) {
            errors.add(field, format!("must be at most {max} characters"));
        }
    }
}

fn validate_description(doc: &Value, errors: &mut ValidationErrors) {
    if let Err(e) = validate_document(doc) {
        errors.add("description", e.to_string());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_input_deserializes_with_defaults() {
        let input: ProductInput = serde_json::from_value(json!({
            "name": "Linen Shirt",
            "category_id": 3,
            "variants": [{"price": "49.00", "cost": "20.00", "is_default": true}]
        }))
        .unwrap();
        assert_eq!(input.status, ProductStatus::Draft);
        assert_eq!(input.category_id, CategoryId::new(3));
        assert_eq!(input.variants.len(), 1);
        assert!(input.validate().is_empty());
    }

    #[test]
    fn test_summary_derived_from_description() {
        let mut input: ProductInput = serde_json::from_value(json!({
            "name": "Linen Shirt",
            "category_id": 1,
            "description": {"type": "root", "children": [
                {"type": "heading", "level": 2, "children": [{"text": "Breathable"}]},
                {"type": "paragraph", "children": [{"text": "Washed "}, {"text": "linen", "bold": true}]}
            ]}
        }))
        .unwrap();
        assert_eq!(input.effective_summary().as_deref(), Some("Breathable Washed linen"));

        input.summary = Some("  Hand picked  ".to_string());
        assert_eq!(input.effective_summary().as_deref(), Some("Hand picked"));

        input.summary = None;
        input.description = None;
        assert_eq!(input.effective_summary(), None);
    }

    #[test]
    fn test_input_rejects_blank_name_and_bad_description() {
        let input: ProductInput = serde_json::from_value(json!({
            "name": "  ",
            "category_id": 1,
            "description": [{"type": "marquee"}]
        }))
        .unwrap();
        let errors = input.validate();
        assert!(errors.contains("name"));
        assert!(errors.contains("description"));
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: ProductPatch =
            serde_json::from_value(json!({"supplier_id": null, "brand": "Acme"})).unwrap();
        assert_eq!(patch.supplier_id, Some(None));
        assert_eq!(patch.brand, Some(Some("Acme".to_string())));
        assert_eq!(patch.tax_class_id, None);
        assert!(patch.name.is_none());
    }

    #[test]
    fn test_translation_limits() {
        let input = ProductTranslationInput {
            meta_title: Some("x".repeat(MAX_META_TITLE_LENGTH + 1)),
            ..ProductTranslationInput::default()
        };
        assert!(input.validate().contains("meta_title"));
    }
}
