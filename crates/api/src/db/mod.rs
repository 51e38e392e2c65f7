//! Database operations for the catalog `PostgreSQL` database.
//!
//! # Schemas
//!
//! - `catalog` - products, variants, images, categories, collections, tags,
//!   product types, suppliers, translations, exchange rates
//! - `tax` - tax classes and their jurisdiction rates
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```
//!
//! Queries are built at runtime (`sqlx::query_as` with `FromRow`, and
//! `QueryBuilder` for optional filters) so the crate builds without a live
//! database.

pub mod categories;
pub mod collections;
pub mod currency;
pub mod images;
pub mod product_types;
pub mod products;
pub mod suppliers;
pub mod tags;
pub mod tax;
pub mod translations;
pub mod variants;

use std::collections::HashSet;
use std::time::Duration;

use emporium_core::slug::{next_available_slug, slugify};
use emporium_core::validation::NON_FIELD_ERRORS;
use emporium_core::{CurrencyCode, ProductStatus, ValidationErrors};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool};
use thiserror::Error;

pub use categories::CategoryRepository;
pub use collections::CollectionRepository;
pub use currency::ExchangeRateRepository;
pub use images::ImageRepository;
pub use product_types::ProductTypeRepository;
pub use products::{ProductFilter, ProductRepository};
pub use suppliers::SupplierRepository;
pub use tags::TagRepository;
pub use tax::TaxRepository;
pub use translations::TranslationRepository;
pub use variants::VariantRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation, reported against a field.
    #[error("constraint violation on {field}: {message}")]
    Conflict { field: String, message: String },

    /// Deletion blocked by rows that still reference the entity.
    #[error("protected: {0}")]
    Protected(String),

    /// Input rejected by a rule that needs stored state to decide.
    #[error("validation failed: {0}")]
    Invalid(ValidationErrors),
}

impl From<ValidationErrors> for RepositoryError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid(errors)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Columns referenced by foreign keys, longest first so prefixes never shadow.
const REFERENCE_COLUMNS: &[&str] = &[
    "default_variant_id",
    "product_type_id",
    "collection_id",
    "tax_class_id",
    "supplier_id",
    "category_id",
    "related_id",
    "product_id",
    "parent_id",
    "image_id",
    "tag_id",
];

/// Field a constraint violation is reported against.
fn constraint_field(constraint: &str) -> String {
    if constraint == "tax_rate_scope_key" {
        return NON_FIELD_ERRORS.to_string();
    }
    if constraint.ends_with("_slug_key") {
        return "slug".to_string();
    }
    if constraint.ends_with("_sku_key") {
        return "sku".to_string();
    }
    if constraint.ends_with("_name_key") {
        return "name".to_string();
    }
    REFERENCE_COLUMNS
        .iter()
        .find(|column| constraint.contains(*column))
        .map_or_else(|| NON_FIELD_ERRORS.to_string(), |column| (*column).to_string())
}

/// Map an insert or update failure to a field-level error.
///
/// Unique violations become [`RepositoryError::Conflict`]; references to
/// missing rows and failed checks become [`RepositoryError::Invalid`].
pub(crate) fn map_write_error(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e {
        let field = db_err.constraint().map(constraint_field);
        if db_err.is_unique_violation() {
            let field = field.unwrap_or_else(|| NON_FIELD_ERRORS.to_string());
            let message = if field == NON_FIELD_ERRORS {
                "a record with these values already exists".to_string()
            } else {
                format!("a record with this {field} already exists")
            };
            return RepositoryError::Conflict { field, message };
        }
        if db_err.is_foreign_key_violation() {
            let field = field.unwrap_or_else(|| NON_FIELD_ERRORS.to_string());
            return RepositoryError::Invalid(ValidationErrors::single(
                field,
                "references a record that does not exist",
            ));
        }
        if db_err.is_check_violation() {
            return RepositoryError::Invalid(ValidationErrors::single(
                field.unwrap_or_else(|| NON_FIELD_ERRORS.to_string()),
                "value is out of range",
            ));
        }
    }
    RepositoryError::Database(e)
}

/// Map a delete failure; rows still referencing the target make it protected.
pub(crate) fn map_delete_error(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::Protected(format!("{what} is still referenced by other records"));
    }
    RepositoryError::Database(e)
}

pub(crate) fn parse_currency(raw: &str) -> Result<CurrencyCode, RepositoryError> {
    raw.parse()
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid currency in database: {e}")))
}

pub(crate) fn parse_status(raw: &str) -> Result<ProductStatus, RepositoryError> {
    raw.parse().map_err(RepositoryError::DataCorruption)
}

/// Pick a unique slug for `table`, deriving it from `name` unless `requested`
/// is given. `exclude` skips the row being updated.
pub(crate) async fn unique_slug<'e, E>(
    executor: E,
    table: &str,
    requested: Option<&str>,
    name: &str,
    fallback: &str,
    exclude: Option<i32>,
) -> Result<String, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let base = requested
        .map(slugify)
        .filter(|s| !s.is_empty())
        .or_else(|| Some(slugify(name)).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| fallback.to_string());

    // `table` is always one of our own constants, never client input.
    let sql = format!(
        "SELECT slug FROM {table} WHERE (slug = $1 OR slug LIKE $1 || '-%') AND id <> COALESCE($2, -1)"
    );
    let taken: HashSet<String> = sqlx::query_scalar::<_, String>(&sql)
        .bind(&base)
        .bind(exclude)
        .fetch_all(executor)
        .await?
        .into_iter()
        .collect();

    Ok(next_available_slug(&base, &taken))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_field_mapping() {
        assert_eq!(constraint_field("product_slug_key"), "slug");
        assert_eq!(constraint_field("category_slug_key"), "slug");
        assert_eq!(constraint_field("product_variant_sku_key"), "sku");
        assert_eq!(constraint_field("tax_class_name_key"), "name");
        assert_eq!(constraint_field("tax_rate_scope_key"), NON_FIELD_ERRORS);
        assert_eq!(constraint_field("product_category_id_fkey"), "category_id");
        assert_eq!(constraint_field("product_product_type_id_fkey"), "product_type_id");
        assert_eq!(constraint_field("product_variant_product_id_fkey"), "product_id");
        assert_eq!(constraint_field("something_else"), NON_FIELD_ERRORS);
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_currency("EUR").ok(), Some(CurrencyCode::EUR));
        assert!(matches!(
            parse_currency("???"),
            Err(RepositoryError::DataCorruption(_))
        ));
        assert_eq!(parse_status("published").ok(), Some(ProductStatus::Published));
        assert!(parse_status("gone").is_err());
    }
}
