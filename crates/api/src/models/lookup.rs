//! Flat lookup entities: collections, tags, product types, suppliers.

use chrono::{DateTime, Utc};
use emporium_core::catalog::lookup::{SupplierContact, validate_optional_name};
use emporium_core::{CollectionId, ProductTypeId, SupplierId, TagId, ValidationErrors};
use serde::{Deserialize, Serialize};

use super::double_option;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Collection {
    pub id: CollectionId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ProductType {
    pub id: ProductTypeId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create and update payload for collections. On update, absent fields keep
/// their stored value; `description: null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl CollectionInput {
    /// `creating` makes `name` required.
    #[must_use]
    pub fn validate(&self, creating: bool) -> ValidationErrors {
        validate_lookup_name(self.name.as_deref(), creating)
    }
}

/// Create and update payload for tags.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TagInput {
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl TagInput {
    #[must_use]
    pub fn validate(&self, creating: bool) -> ValidationErrors {
        validate_lookup_name(self.name.as_deref(), creating)
    }
}

/// Create and update payload for product types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductTypeInput {
    pub name: Option<String>,
}

impl ProductTypeInput {
    #[must_use]
    pub fn validate(&self, creating: bool) -> ValidationErrors {
        validate_lookup_name(self.name.as_deref(), creating)
    }
}

/// Create and update payload for suppliers.
///
/// On update every contact field is replaced; omitted ones are cleared.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierInput {
    pub name: Option<String>,
    #[serde(flatten)]
    pub contact: SupplierContact,
}

impl SupplierInput {
    #[must_use]
    pub fn validate(&self, creating: bool) -> ValidationErrors {
        let mut errors = validate_lookup_name(self.name.as_deref(), creating);
        errors.merge(self.contact.clone().normalized().validate());
        errors
    }
}

fn validate_lookup_name(name: Option<&str>, creating: bool) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    match name {
        None if creating => errors.add("name", "this field is required"),
        other => validate_optional_name("name", other, &mut errors),
    }
    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_name_required_on_create_only() {
        let input = TagInput::default();
        assert!(input.validate(true).contains("name"));
        assert!(input.validate(false).is_empty());
    }

    #[test]
    fn test_supplier_contact_is_flattened() {
        let input: SupplierInput = serde_json::from_value(json!({
            "name": "Acme Mills",
            "email": "bad-address",
            "website": "https://acme.test"
        }))
        .unwrap();
        assert_eq!(input.contact.website.as_deref(), Some("https://acme.test"));
        let errors = input.validate(true);
        assert!(errors.contains("email"));
        assert!(!errors.contains("website"));
    }

    #[test]
    fn test_collection_description_null_clears() {
        let input: CollectionInput =
            serde_json::from_value(json!({"description": null})).unwrap();
        assert_eq!(input.description, Some(None));
    }
}
