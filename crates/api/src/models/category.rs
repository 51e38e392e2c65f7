//! Category models.

use chrono::{DateTime, Utc};
use emporium_core::catalog::TreeItem;
use emporium_core::catalog::lookup::{validate_name, validate_optional_name};
use emporium_core::{CategoryId, ValidationErrors};
use serde::{Deserialize, Serialize};

use super::double_option;

/// A catalog category, with translatable fields resolved for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TreeItem for Category {
    fn tree_id(&self) -> CategoryId {
        self.id
    }

    fn tree_parent(&self) -> Option<CategoryId> {
        self.parent_id
    }
}

/// Payload for `POST /api/categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub position: i32,
}

impl CategoryInput {
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_name("name", &self.name, &mut errors);
        errors
    }
}

/// Payload for `PATCH /api/categories/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<CategoryId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub position: Option<i32>,
}

impl CategoryPatch {
    #[must_use]
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        validate_optional_name("name", self.name.as_deref(), &mut errors);
        errors
    }
}

/// Payload for `PUT /api/categories/{id}/translations/{lang}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryTranslationInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
