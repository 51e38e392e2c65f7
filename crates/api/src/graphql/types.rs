//! GraphQL object types.
//!
//! Products and variants wrap the same presented values the REST API
//! returns, so prices are already in the request currency and translated
//! fields in the request language.

use async_graphql::{ComplexObject, Context, Enum, InputObject, Object, Result, SimpleObject};
use chrono::{DateTime, Utc};
use emporium_core::ProductStatus;
use emporium_core::catalog::TreeNode;
use rust_decimal::Decimal;

use super::{GraphQLResultExt, request_parts};
use crate::db::{CategoryRepository, CollectionRepository, ProductRepository, TagRepository, TaxRepository};
use crate::models::{
    Category, Collection, PriceView, ProductDetail, ProductImage, Supplier, Tag, TaxClass, TaxRate,
    VariantView,
};
use crate::routes::products::present;

/// Publication status of a product.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(name = "ProductStatus")]
pub enum Status {
    Draft,
    Published,
    Archived,
}

impl From<ProductStatus> for Status {
    fn from(status: ProductStatus) -> Self {
        match status {
            ProductStatus::Draft => Self::Draft,
            ProductStatus::Published => Self::Published,
            ProductStatus::Archived => Self::Archived,
        }
    }
}

impl From<Status> for ProductStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Draft => Self::Draft,
            Status::Published => Self::Published,
            Status::Archived => Self::Archived,
        }
    }
}

/// An amount in one currency with its localized rendering.
#[derive(SimpleObject, Debug, Clone)]
pub struct Money {
    pub amount: Decimal,
    pub currency: String,
    pub formatted: String,
}

impl From<PriceView> for Money {
    fn from(view: PriceView) -> Self {
        Self {
            amount: view.amount,
            currency: view.currency.code().to_string(),
            formatted: view.formatted,
        }
    }
}

/// Product listing filter.
#[derive(InputObject, Debug, Default)]
pub struct ProductFilterInput {
    /// Ignored for anonymous callers.
    pub status: Option<Status>,
    pub category: Option<i32>,
    pub collection: Option<i32>,
    pub tag: Option<i32>,
    pub supplier: Option<i32>,
    pub brand: Option<String>,
    pub search: Option<String>,
    /// `name`, `created_at`, `updated_at` or `price`, optionally prefixed
    /// with `-`.
    pub ordering: Option<String>,
}

pub struct Product(pub ProductDetail);

#[Object]
impl Product {
    async fn id(&self) -> i32 {
        self.0.product.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.product.name
    }

    async fn slug(&self) -> &str {
        &self.0.product.slug
    }

    async fn summary(&self) -> Option<&str> {
        self.0.product.summary.as_deref()
    }

    /// Description rendered to HTML.
    async fn description_html(&self) -> &str {
        &self.0.description_html
    }

    async fn brand(&self) -> Option<&str> {
        self.0.product.brand.as_deref()
    }

    async fn status(&self) -> Status {
        self.0.product.status.into()
    }

    /// Default variant price in the request currency.
    async fn price(&self) -> Option<Money> {
        self.0.price.clone().map(Money::from)
    }

    async fn variants(&self) -> Vec<Variant> {
        self.0.variants.iter().cloned().map(Variant).collect()
    }

    async fn images(&self) -> Vec<Image> {
        self.0.images.iter().map(Image::from).collect()
    }

    async fn category(&self, ctx: &Context<'_>) -> Result<Option<CategoryNode>> {
        let (state, request) = request_parts(ctx)?;
        let category = CategoryRepository::new(state.pool())
            .get(self.0.product.category_id, request.translation())
            .await
            .gql()?;
        Ok(category.map(CategoryNode))
    }

    async fn collections(&self, ctx: &Context<'_>) -> Result<Vec<CollectionNode>> {
        let (state, _) = request_parts(ctx)?;
        let collections = CollectionRepository::new(state.pool())
            .by_ids(&self.0.collections)
            .await
            .gql()?;
        Ok(collections.into_iter().map(CollectionNode).collect())
    }

    async fn tags(&self, ctx: &Context<'_>) -> Result<Vec<TagNode>> {
        let (state, _) = request_parts(ctx)?;
        let tags = TagRepository::new(state.pool())
            .by_ids(&self.0.tags)
            .await
            .gql()?;
        Ok(tags.into_iter().map(TagNode).collect())
    }

    /// Related products visible to the caller.
    async fn related(&self, ctx: &Context<'_>) -> Result<Vec<Self>> {
        let (state, request) = request_parts(ctx)?;
        let anonymous = super::viewer(ctx).is_none();
        let records = ProductRepository::new(state.pool())
            .load(&self.0.related, request.translation())
            .await
            .gql()?;
        let mut related = Vec::with_capacity(records.len());
        for record in records {
            if anonymous && !record.product.status.is_public() {
                continue;
            }
            related.push(Self(present(state, request, record).await));
        }
        Ok(related)
    }

    async fn meta_title(&self) -> Option<&str> {
        self.0.product.meta_title.as_deref()
    }

    async fn meta_description(&self) -> Option<&str> {
        self.0.product.meta_description.as_deref()
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.product.created_at
    }

    async fn updated_at(&self) -> DateTime<Utc> {
        self.0.product.updated_at
    }
}

pub struct Variant(pub VariantView);

#[Object]
impl Variant {
    async fn id(&self) -> i32 {
        self.0.variant.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.variant.name
    }

    async fn sku(&self) -> Option<&str> {
        self.0.variant.sku.as_deref()
    }

    /// Price in the request currency.
    async fn price(&self) -> Money {
        self.0.display_price.clone().into()
    }

    async fn compare_at_price(&self) -> Option<Money> {
        self.0.display_compare_at_price.clone().map(Money::from)
    }

    async fn quantity(&self) -> i32 {
        self.0.variant.quantity
    }

    /// Whether the variant can be ordered right now.
    async fn available(&self) -> bool {
        let v = &self.0.variant;
        !v.track_inventory || v.allow_backorder || v.quantity > 0
    }

    async fn weight_grams(&self) -> Option<i32> {
        self.0.variant.weight_grams
    }

    async fn is_default(&self) -> bool {
        self.0.variant.is_default
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Image {
    pub id: i32,
    pub url: String,
    pub alt: String,
    pub position: i32,
}

impl From<&ProductImage> for Image {
    fn from(image: &ProductImage) -> Self {
        Self {
            id: image.id.as_i32(),
            url: image.url.clone(),
            alt: image.alt.clone(),
            position: image.position,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryNode(pub Category);

#[Object(name = "Category")]
impl CategoryNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn parent_id(&self) -> Option<i32> {
        self.0.parent_id.map(|id| id.as_i32())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn slug(&self) -> &str {
        &self.0.slug
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn position(&self) -> i32 {
        self.0.position
    }
}

/// A category with its descendants.
#[derive(SimpleObject)]
#[graphql(complex)]
pub struct CategoryTree {
    #[graphql(skip)]
    pub item: Category,
    pub children: Vec<CategoryTree>,
}

#[ComplexObject]
impl CategoryTree {
    async fn category(&self) -> CategoryNode {
        CategoryNode(self.item.clone())
    }
}

impl From<TreeNode<Category>> for CategoryTree {
    fn from(node: TreeNode<Category>) -> Self {
        Self {
            item: node.item,
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

pub struct CollectionNode(pub Collection);

#[Object(name = "Collection")]
impl CollectionNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn slug(&self) -> &str {
        &self.0.slug
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }
}

pub struct TagNode(pub Tag);

#[Object(name = "Tag")]
impl TagNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn slug(&self) -> &str {
        &self.0.slug
    }
}

pub struct SupplierNode(pub Supplier);

#[Object(name = "Supplier")]
impl SupplierNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }

    async fn phone(&self) -> Option<&str> {
        self.0.phone.as_deref()
    }

    async fn website(&self) -> Option<&str> {
        self.0.website.as_deref()
    }
}

pub struct TaxClassNode(pub TaxClass);

#[Object(name = "TaxClass")]
impl TaxClassNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    async fn rates(&self, ctx: &Context<'_>) -> Result<Vec<TaxRateNode>> {
        let (state, _) = request_parts(ctx)?;
        let rates = TaxRepository::new(state.pool())
            .rates_for_class(self.0.id)
            .await
            .gql()?;
        Ok(rates.into_iter().map(TaxRateNode).collect())
    }
}

pub struct TaxRateNode(pub TaxRate);

#[Object(name = "TaxRate")]
impl TaxRateNode {
    async fn id(&self) -> i32 {
        self.0.id.as_i32()
    }

    async fn country(&self) -> &str {
        &self.0.country
    }

    async fn state(&self) -> Option<&str> {
        self.0.state.as_deref()
    }

    /// Percentage, e.g. `19.00`.
    async fn rate(&self) -> Decimal {
        self.0.rate
    }
}

#[cfg(test)]
mod tests {
    use emporium_core::CurrencyCode;

    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [ProductStatus::Draft, ProductStatus::Published, ProductStatus::Archived] {
            assert_eq!(ProductStatus::from(Status::from(status)), status);
        }
    }

    #[test]
    fn test_money_from_price_view() {
        let money = Money::from(PriceView {
            amount: Decimal::new(1999, 2),
            currency: CurrencyCode::EUR,
            formatted: "19,99 €".to_string(),
        });
        assert_eq!(money.currency, "EUR");
        assert_eq!(money.amount, Decimal::new(1999, 2));
    }
}
