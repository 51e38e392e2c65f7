//! Variant payload validation and the default-variant invariant.
//!
//! A product with any variants has exactly one default variant. On create
//! the payload must flag one; on update a payload may omit the flag only if
//! the product already has a default. SKUs are unique across the catalog;
//! duplicates inside one payload are caught here before touching storage, and
//! collisions with stored SKUs are caught by the database constraint.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CurrencyCode, ImageId, Price, double_option};
use crate::validation::{NON_FIELD_ERRORS, ValidationErrors};

/// Largest amount that fits the `NUMERIC(12, 3)` price columns.
const MAX_AMOUNT: i64 = 1_000_000_000;
const MAX_NAME_LENGTH: usize = 255;
const MAX_SKU_LENGTH: usize = 64;

const fn default_true() -> bool {
    true
}

/// One variant entry of a create or add-variants payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDraft {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    #[serde(default)]
    pub compare_at_price: Option<Decimal>,
    /// Defaults to the catalog base currency.
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub weight_grams: Option<i32>,
    #[serde(default = "default_true")]
    pub track_inventory: bool,
    #[serde(default)]
    pub allow_backorder: bool,
    #[serde(default)]
    pub quantity: i32,
    /// One of the product's images shown for this variant.
    #[serde(default)]
    pub image_id: Option<ImageId>,
    #[serde(default)]
    pub is_default: bool,
}

impl VariantDraft {
    /// The SKU with surrounding whitespace removed; blank SKUs become `None`.
    #[must_use]
    pub fn normalized_sku(&self) -> Option<&str> {
        normalize_sku(self.sku.as_deref())
    }

    /// The variant currency, or `base` when the payload omitted it.
    #[must_use]
    pub fn currency_or(&self, base: CurrencyCode) -> CurrencyCode {
        self.currency.unwrap_or(base)
    }

    /// Validate this entry in isolation.
    #[must_use]
    pub fn validate(&self, base: CurrencyCode) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let currency = self.currency_or(base);

        if self.name.chars().count() > MAX_NAME_LENGTH {
            errors.add("name", format!("must be at most {MAX_NAME_LENGTH} characters"));
        }
        if let Some(sku) = self.normalized_sku() {
            validate_sku(sku, &mut errors);
        }
        validate_amount("price", self.price, currency, &mut errors);
        validate_amount("cost", self.cost, currency, &mut errors);
        if let Some(compare_at) = self.compare_at_price {
            validate_amount("compare_at_price", compare_at, currency, &mut errors);
        }
        if self.weight_grams.is_some_and(|w| w < 0) {
            errors.add("weight_grams", "must not be negative");
        }
        if self.quantity < 0 && !self.allow_backorder {
            errors.add("quantity", "must not be negative unless backorders are allowed");
        }
        errors
    }
}

/// Partial update of a single variant.
///
/// `compare_at_price` and `image_id` are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantPatch {
    #[serde(default)]
    pub name: Option<String>,
    /// `Some("")` clears the SKU.
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub compare_at_price: Option<Option<Decimal>>,
    #[serde(default)]
    pub currency: Option<CurrencyCode>,
    #[serde(default)]
    pub weight_grams: Option<i32>,
    #[serde(default)]
    pub track_inventory: Option<bool>,
    #[serde(default)]
    pub allow_backorder: Option<bool>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_id: Option<Option<ImageId>>,
    #[serde(default)]
    pub is_default: Option<bool>,
}

impl VariantPatch {
    /// Validate the fields present in the patch against the effective currency.
    #[must_use]
    pub fn validate(&self, currency: CurrencyCode) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self
            .name
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NAME_LENGTH)
        {
            errors.add("name", format!("must be at most {MAX_NAME_LENGTH} characters"));
        }
        if let Some(sku) = normalize_sku(self.sku.as_deref()) {
            validate_sku(sku, &mut errors);
        }
        for (field, value) in [
            ("price", self.price),
            ("cost", self.cost),
            ("compare_at_price", self.compare_at_price.flatten()),
        ] {
            if let Some(amount) = value {
                validate_amount(field, amount, currency, &mut errors);
            }
        }
        if self.weight_grams.is_some_and(|w| w < 0) {
            errors.add("weight_grams", "must not be negative");
        }
        if self.is_default == Some(false) {
            errors.add(
                "is_default",
                "the default cannot be unset directly; flag another variant as default",
            );
        }
        errors
    }
}

/// Validate a batch of variant drafts for one product.
///
/// Returns the index of the entry flagged as default, or `None` when the
/// product keeps its existing default.
///
/// # Errors
///
/// Returns field errors keyed as `variants[i].field` for per-entry problems,
/// `variants[i].sku` for SKUs repeated within the batch, and `variants` for
/// batch-level problems (empty batch on create, zero or several defaults).
pub fn validate_variant_batch(
    drafts: &[VariantDraft],
    base: CurrencyCode,
    has_existing_default: bool,
) -> Result<Option<usize>, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if drafts.is_empty() && !has_existing_default {
        errors.add("variants", "at least one variant is required");
        return Err(errors);
    }

    let mut seen_skus: HashMap<&str, usize> = HashMap::new();
    for (i, draft) in drafts.iter().enumerate() {
        let prefix = format!("variants[{i}]");
        let mut entry = draft.validate(base);
        if let Some(sku) = draft.normalized_sku() {
            if let Some(first) = seen_skus.get(sku) {
                entry.add(
                    "sku",
                    format!("duplicate SKU '{sku}' (also used by variants[{first}])"),
                );
            } else {
                seen_skus.insert(sku, i);
            }
        }
        errors.merge_prefixed(&prefix, entry);
    }

    let flagged: Vec<usize> = drafts
        .iter()
        .enumerate()
        .filter_map(|(i, d)| d.is_default.then_some(i))
        .collect();

    let default_index = match flagged.as_slice() {
        [] if has_existing_default => None,
        [] => {
            errors.add("variants", "one variant must be flagged as the default");
            None
        }
        [only] => Some(*only),
        _ => {
            errors.add("variants", "only one variant can be flagged as the default");
            None
        }
    };

    errors.into_result().map(|()| default_index)
}

/// Reject deleting the variant a product currently points at as its default.
///
/// # Errors
///
/// Returns a non-field error when `variant_is_default` is true.
pub fn check_variant_deletable(variant_is_default: bool) -> Result<(), ValidationErrors> {
    if variant_is_default {
        return Err(ValidationErrors::single(
            NON_FIELD_ERRORS,
            "cannot delete the default variant; flag another variant as default first",
        ));
    }
    Ok(())
}

/// Check that `amount` is positive, in range, and aligned to the currency's minor unit.
pub fn validate_amount(
    field: &str,
    amount: Decimal,
    currency: CurrencyCode,
    errors: &mut ValidationErrors,
) {
    if amount <= Decimal::ZERO {
        errors.add(field, "must be greater than zero");
        return;
    }
    if amount >= Decimal::from(MAX_AMOUNT) {
        errors.add(field, format!("must be less than {MAX_AMOUNT}"));
    }
    if !Price::new(amount, currency).is_precision_aligned() {
        errors.add(
            field,
            format!(
                "must have at most {} decimal places for {currency}",
                currency.exponent()
            ),
        );
    }
}

fn normalize_sku(sku: Option<&str>) -> Option<&str> {
    sku.map(str::trim).filter(|s| !s.is_empty())
}

fn validate_sku(sku: &str, errors: &mut ValidationErrors) {
    if sku.len() > MAX_SKU_LENGTH {
        errors.add("sku", format!("must be at most {MAX_SKU_LENGTH} characters"));
    }
    if sku.chars().any(char::is_whitespace) {
        errors.add("sku", "must not contain whitespace");
    }
}
