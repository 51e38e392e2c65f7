//! Seed the catalog with development fixtures.
//!
//! Creates tax classes and rates, a two-level category tree, collections,
//! tags, suppliers, product types, and `products` products with two or three
//! variants each. Refuses to run against a catalog that already has
//! categories.

use emporium_api::db::{
    CategoryRepository, CollectionRepository, ProductRepository, ProductTypeRepository,
    RepositoryError, SupplierRepository, TagRepository, TaxRepository,
};
use emporium_api::models::{
    CategoryInput, CollectionInput, ProductInput, ProductTypeInput, SupplierInput, TagInput,
    TaxClassInput, TaxRateInput,
};
use emporium_core::{
    CategoryId, CollectionId, CurrencyCode, ProductTypeId, SupplierId, TagId, TaxClassId,
};
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use thiserror::Error;

use super::SetupError;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    #[error("Catalog already has {0} categories; seed an empty database")]
    NotEmpty(i64),
}

/// Counts of what was created.
#[derive(Debug, Default)]
pub struct SeedSummary {
    pub tax_classes: usize,
    pub categories: usize,
    pub lookups: usize,
    pub products: usize,
}

/// `(country, state, rate)` per tax class.
const TAX_FIXTURES: &[(&str, &[(&str, Option<&str>, &str)])] = &[
    (
        "Standard",
        &[
            ("DE", None, "19.00"),
            ("FR", None, "20.00"),
            ("US", Some("CA"), "7.25"),
            ("US", Some("NY"), "4.00"),
        ],
    ),
    ("Reduced", &[("DE", None, "7.00"), ("FR", None, "5.50")]),
];

/// `(parent, children)`
const CATEGORY_FIXTURES: &[(&str, &[&str])] = &[
    ("Apparel", &["Shirts", "Outerwear", "Accessories"]),
    ("Home", &["Kitchen", "Bedding"]),
];

const COLLECTIONS: &[&str] = &["Summer Edit", "Best Sellers", "Gift Ideas"];
const TAGS: &[&str] = &["organic", "new", "sale", "limited"];
const SUPPLIERS: &[&str] = &["Northwind Textiles", "Harbor Goods"];
const PRODUCT_TYPES: &[&str] = &["Clothing", "Homeware"];

const ADJECTIVES: &[&str] = &["Classic", "Everyday", "Heritage", "Coastal", "Alpine", "Studio"];
const NOUNS: &[&str] = &["Tee", "Jacket", "Scarf", "Mug", "Throw", "Apron", "Cap"];
const SIZES: &[&str] = &["S", "M", "L"];

struct Lookups {
    categories: Vec<CategoryId>,
    collections: Vec<CollectionId>,
    tags: Vec<TagId>,
    suppliers: Vec<SupplierId>,
    product_types: Vec<ProductTypeId>,
    tax_classes: Vec<TaxClassId>,
}

/// Pick an element by index, wrapping around.
fn cycle<T: Copy>(items: &[T], index: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        items.get(index % items.len()).copied()
    }
}

/// Product payload for fixture number `index`.
fn product_fixture(index: usize, lookups: &Lookups) -> serde_json::Value {
    let adjective = cycle(ADJECTIVES, index).unwrap_or("Plain");
    let noun = cycle(NOUNS, index / ADJECTIVES.len() + index).unwrap_or("Item");
    let name = format!("{adjective} {noun} {}", index + 1);

    // 12.00 .. 89.00 in whole units
    let base_cents = 1200 + i64::try_from(index % 78).unwrap_or(0) * 100;
    let variant_count = 2 + index % 2;
    let variants: Vec<serde_json::Value> = SIZES
        .iter()
        .take(variant_count)
        .enumerate()
        .map(|(i, size)| {
            let price = Decimal::new(base_cents + i64::try_from(i).unwrap_or(0) * 200, 2);
            let cost = (price * Decimal::new(45, 2)).round_dp(2);
            json!({
                "name": *size,
                "sku": format!("SEED-{:04}-{size}", index + 1),
                "price": price.to_string(),
                "cost": cost.to_string(),
                "compare_at_price": (index % 5 == 0).then(|| (price + Decimal::new(500, 2)).to_string()),
                "quantity": (index * 7 + i * 3) % 40,
                "weight_grams": 150 + i * 50,
                "is_default": i == 1,
            })
        })
        .collect();

    let description = json!({
        "type": "root",
        "children": [{
            "type": "paragraph",
            "children": [
                { "text": "The " },
                { "text": name.to_lowercase(), "bold": true },
                { "text": " in its seed edition." }
            ]
        }]
    });

    json!({
        "name": name,
        "summary": format!("{adjective} {} for everyday use.", noun.to_lowercase()),
        "description": description,
        "brand": if index % 3 == 0 { "Emporium" } else { "Harbor" },
        "status": if index % 4 == 3 { "draft" } else { "published" },
        "category_id": cycle(&lookups.categories, index),
        "supplier_id": cycle(&lookups.suppliers, index),
        "tax_class_id": cycle(&lookups.tax_classes, index),
        "product_type_id": cycle(&lookups.product_types, index),
        "collections": cycle(&lookups.collections, index).into_iter().collect::<Vec<_>>(),
        "tags": cycle(&lookups.tags, index).into_iter().chain(cycle(&lookups.tags, index + 1)).collect::<Vec<_>>(),
        "variants": variants,
    })
}

async fn seed_tax(pool: &PgPool) -> Result<Vec<TaxClassId>, SeedError> {
    let repo = TaxRepository::new(pool);
    let mut ids = Vec::new();
    for (name, rates) in TAX_FIXTURES {
        let class = repo
            .create_class(&TaxClassInput {
                name: Some((*name).to_string()),
                description: None,
            })
            .await?;
        for (country, state, rate) in *rates {
            let input: TaxRateInput = serde_json::from_value(json!({
                "country": country,
                "state": state,
                "rate": rate,
            }))?;
            repo.create_rate(class.id, &input).await?;
        }
        ids.push(class.id);
    }
    Ok(ids)
}

async fn seed_categories(pool: &PgPool) -> Result<Vec<CategoryId>, SeedError> {
    let repo = CategoryRepository::new(pool);
    let mut leaves = Vec::new();
    for (position, (parent, children)) in (0..).zip(CATEGORY_FIXTURES) {
        let root = repo
            .create(&CategoryInput {
                name: (*parent).to_string(),
                slug: None,
                parent_id: None,
                description: None,
                position,
            })
            .await?;
        for (position, child) in (0..).zip(*children) {
            let category = repo
                .create(&CategoryInput {
                    name: (*child).to_string(),
                    slug: None,
                    parent_id: Some(root.id),
                    description: None,
                    position,
                })
                .await?;
            leaves.push(category.id);
        }
    }
    Ok(leaves)
}

async fn seed_lookups(
    pool: &PgPool,
    tax_classes: Vec<TaxClassId>,
    categories: Vec<CategoryId>,
) -> Result<Lookups, SeedError> {
    let mut collections = Vec::new();
    for name in COLLECTIONS {
        let input = CollectionInput {
            name: Some((*name).to_string()),
            ..CollectionInput::default()
        };
        collections.push(CollectionRepository::new(pool).create(&input).await?.id);
    }

    let mut tags = Vec::new();
    for name in TAGS {
        let input = TagInput {
            name: Some((*name).to_string()),
            slug: None,
        };
        tags.push(TagRepository::new(pool).create(&input).await?.id);
    }

    let mut suppliers = Vec::new();
    for name in SUPPLIERS {
        let input = SupplierInput {
            name: Some((*name).to_string()),
            ..SupplierInput::default()
        };
        suppliers.push(SupplierRepository::new(pool).create(&input).await?.id);
    }

    let mut product_types = Vec::new();
    for name in PRODUCT_TYPES {
        let input = ProductTypeInput {
            name: Some((*name).to_string()),
        };
        product_types.push(ProductTypeRepository::new(pool).create(&input).await?.id);
    }

    Ok(Lookups {
        categories,
        collections,
        tags,
        suppliers,
        product_types,
        tax_classes,
    })
}

/// Seed an empty catalog.
///
/// # Errors
///
/// Returns `SeedError::NotEmpty` if categories already exist, or the first
/// repository error encountered.
pub async fn run(products: usize) -> Result<SeedSummary, SeedError> {
    let pool = super::connect().await?;
    let base: CurrencyCode = std::env::var("EMPORIUM_BASE_CURRENCY")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(CurrencyCode::USD);

    let existing = CategoryRepository::new(&pool).count().await?;
    if existing > 0 {
        return Err(SeedError::NotEmpty(existing));
    }

    let mut summary = SeedSummary::default();

    let tax_classes = seed_tax(&pool).await?;
    summary.tax_classes = tax_classes.len();
    tracing::info!(count = summary.tax_classes, "Tax classes created");

    let categories = seed_categories(&pool).await?;
    summary.categories = CATEGORY_FIXTURES.len() + categories.len();
    tracing::info!(count = summary.categories, "Categories created");

    let lookups = seed_lookups(&pool, tax_classes, categories).await?;
    summary.lookups = COLLECTIONS.len() + TAGS.len() + SUPPLIERS.len() + PRODUCT_TYPES.len();
    tracing::info!(count = summary.lookups, "Collections, tags, suppliers and product types created");

    let repo = ProductRepository::new(&pool);
    for index in 0..products {
        let input: ProductInput = serde_json::from_value(product_fixture(index, &lookups))?;
        input.validate().into_result().map_err(RepositoryError::Invalid)?;
        let id = repo.create(&input, base).await?;
        tracing::debug!(product_id = %id, name = %input.name, "Product created");
        summary.products += 1;
    }
    tracing::info!(count = summary.products, base = %base, "Products created");

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn lookups() -> Lookups {
        Lookups {
            categories: vec![CategoryId::new(3), CategoryId::new(4)],
            collections: vec![CollectionId::new(1)],
            tags: vec![TagId::new(1), TagId::new(2)],
            suppliers: vec![SupplierId::new(1)],
            product_types: vec![ProductTypeId::new(1)],
            tax_classes: vec![TaxClassId::new(1)],
        }
    }

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(cycle(&[1, 2, 3], 4), Some(2));
        assert_eq!(cycle::<i32>(&[], 4), None);
    }

    #[test]
    fn test_product_fixture_is_valid_input() {
        for index in 0..20 {
            let input: ProductInput =
                serde_json::from_value(product_fixture(index, &lookups())).unwrap();
            assert!(input.validate().is_empty(), "fixture {index} invalid");
            assert_eq!(input.variants.iter().filter(|v| v.is_default).count(), 1);
            assert!(input.variants.len() >= 2);
        }
    }

    #[test]
    fn test_product_fixture_skus_are_unique() {
        let mut skus: Vec<String> = (0..30)
            .flat_map(|index| {
                let input: ProductInput =
                    serde_json::from_value(product_fixture(index, &lookups())).unwrap();
                input.variants.into_iter().filter_map(|v| v.sku)
            })
            .collect();
        let total = skus.len();
        skus.sort();
        skus.dedup();
        assert_eq!(skus.len(), total);
    }
}
