//! Row types, API payloads, and response shapes.

pub mod category;
pub mod lookup;
pub mod product;
pub mod tax;

pub use category::{Category, CategoryInput, CategoryPatch, CategoryTranslationInput};
pub use lookup::{
    Collection, CollectionInput, ProductType, ProductTypeInput, Supplier, SupplierInput, Tag,
    TagInput,
};
pub use product::{
    PriceView, Product, ProductDetail, ProductImage, ProductInput, ProductPatch, ProductRecord,
    ProductTranslationInput, Variant, VariantView,
};
pub use tax::{TaxClass, TaxClassInput, TaxRate, TaxRateInput};

pub(crate) use emporium_core::double_option;

/// Trim an optional string, treating blanks as absent.
pub(crate) fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
