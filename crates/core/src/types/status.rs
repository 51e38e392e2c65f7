//! Status and role enums.

use serde::{Deserialize, Serialize};

/// Publication status of a product.
///
/// Stored as the `catalog.product_status` enum; queries cast it through text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    /// Whether the product is visible to anonymous callers.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Published)
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Published => write!(f, "published"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            _ => Err(format!("invalid product status: {s}")),
        }
    }
}

/// A capability checked by the API before mutating state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Create, update, and delete single catalog records.
    CatalogWrite,
    /// Apply status changes or deletion to many products at once.
    CatalogBulk,
    /// Manage tax classes and rates.
    TaxWrite,
    /// Staff-only operations such as replacing the admin bundle.
    Staff,
}

/// API caller role with different permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access; equivalent to an anonymous caller plus drafts.
    Viewer,
    /// Single-record catalog edits.
    Editor,
    /// Catalog edits, bulk operations, and tax management.
    Manager,
    /// Everything, including staff-only endpoints.
    Staff,
}

impl Role {
    /// Permissions granted to this role.
    #[must_use]
    pub const fn permissions(self) -> &'static [Permission] {
        match self {
            Self::Viewer => &[],
            Self::Editor => &[Permission::CatalogWrite],
            Self::Manager => &[
                Permission::CatalogWrite,
                Permission::CatalogBulk,
                Permission::TaxWrite,
            ],
            Self::Staff => &[
                Permission::CatalogWrite,
                Permission::CatalogBulk,
                Permission::TaxWrite,
                Permission::Staff,
            ],
        }
    }

    /// Check whether this role grants `permission`.
    #[must_use]
    pub fn has(self, permission: Permission) -> bool {
        self.permissions().contains(&permission)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Viewer => write!(f, "viewer"),
            Self::Editor => write!(f, "editor"),
            Self::Manager => write!(f, "manager"),
            Self::Staff => write!(f, "staff"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Self::Viewer),
            "editor" => Ok(Self::Editor),
            "manager" => Ok(Self::Manager),
            "staff" => Ok(Self::Staff),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_is_distinct_from_write() {
        assert!(Role::Editor.has(Permission::CatalogWrite));
        assert!(!Role::Editor.has(Permission::CatalogBulk));
        assert!(Role::Manager.has(Permission::CatalogBulk));
    }

    #[test]
    fn test_only_staff_has_staff_permission() {
        for role in [Role::Viewer, Role::Editor, Role::Manager] {
            assert!(!role.has(Permission::Staff));
        }
        assert!(Role::Staff.has(Permission::Staff));
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [Role::Viewer, Role::Editor, Role::Manager, Role::Staff] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_product_status_parse() {
        assert_eq!("published".parse(), Ok(ProductStatus::Published));
        assert!("live".parse::<ProductStatus>().is_err());
        assert!(ProductStatus::Published.is_public());
        assert!(!ProductStatus::Draft.is_public());
    }
}
