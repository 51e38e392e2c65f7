//! Root query object.

use async_graphql::connection::{Connection, Edge, EmptyFields, query};
use async_graphql::{Context, Object, Result, SimpleObject};
use emporium_core::catalog::listing::MAX_PAGE_SIZE;
use emporium_core::catalog::{PageRequest, build_tree};
use emporium_core::{CategoryId, CollectionId, ProductId, SupplierId, TagId};

use super::types::{
    CategoryNode, CategoryTree, CollectionNode, Product, ProductFilterInput, SupplierNode, TagNode,
    TaxClassNode,
};
use super::{GraphQLResultExt, request_parts, viewer};
use crate::db::{
    CategoryRepository, CollectionRepository, ProductRepository, SupplierRepository, TagRepository,
    TaxRepository,
};
use crate::error::AppError;
use crate::routes::products::{ProductListQuery, present};

/// Page size when neither `first` nor `last` is given.
const DEFAULT_CONNECTION_SIZE: usize = 20;

/// Extra fields on every connection.
#[derive(SimpleObject)]
pub struct ConnectionTotal {
    /// Items matching the query, across all pages.
    pub total_count: i64,
}

pub type ProductConnection = Connection<usize, Product, ConnectionTotal, EmptyFields>;
pub type CategoryConnection = Connection<usize, CategoryNode, ConnectionTotal, EmptyFields>;

/// Offset window `[start, end)` for relay arguments over `total` items.
///
/// Cursors are item offsets. `first` and `last` are capped at the REST page
/// size limit.
fn window(
    after: Option<usize>,
    before: Option<usize>,
    first: Option<usize>,
    last: Option<usize>,
    total: usize,
) -> (usize, usize) {
    let max = MAX_PAGE_SIZE as usize;
    let mut start = after.map_or(0, |after| after.saturating_add(1)).min(total);
    let mut end = before.unwrap_or(total).clamp(start, total);
    if let Some(first) = first {
        end = end.min(start + first.min(max));
    }
    if let Some(last) = last {
        start = start.max(end.saturating_sub(last.min(max)));
    }
    if first.is_none() && last.is_none() {
        end = end.min(start + DEFAULT_CONNECTION_SIZE);
    }
    (start, end)
}

fn to_usize(count: i64) -> usize {
    usize::try_from(count).unwrap_or(0)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub struct Query;

#[Object]
impl Query {
    /// A product by id or slug. Drafts are visible to authenticated callers
    /// only.
    async fn product(
        &self,
        ctx: &Context<'_>,
        id: Option<i32>,
        slug: Option<String>,
    ) -> Result<Option<Product>> {
        let (state, request) = request_parts(ctx)?;
        let repo = ProductRepository::new(state.pool());
        let id = match (id, slug) {
            (Some(id), _) => ProductId::new(id),
            (None, Some(slug)) => match repo.id_by_slug(&slug).await.gql()? {
                Some(id) => id,
                None => return Ok(None),
            },
            (None, None) => {
                return Err(AppError::BadRequest("either id or slug is required".into()).into_graphql());
            }
        };
        let Some(record) = repo.get(id, request.translation()).await.gql()? else {
            return Ok(None);
        };
        if viewer(ctx).is_none() && !record.product.status.is_public() {
            return Ok(None);
        }
        Ok(Some(Product(present(state, request, record).await)))
    }

    /// Filtered products as an offset-cursor connection.
    async fn products(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        filter: Option<ProductFilterInput>,
    ) -> Result<ProductConnection> {
        let (state, request) = request_parts(ctx)?;
        let filter = filter.unwrap_or_default();
        let list_query = ProductListQuery {
            status: filter.status.map(Into::into),
            category: filter.category.map(CategoryId::new),
            collection: filter.collection.map(CollectionId::new),
            tag: filter.tag.map(TagId::new),
            supplier: filter.supplier.map(SupplierId::new),
            brand: filter.brand,
            search: filter.search,
            ordering: filter.ordering,
            ..ProductListQuery::default()
        };
        let filter = list_query.filter(viewer(ctx));

        query(after, before, first, last, |after, before, first, last| async move {
            let repo = ProductRepository::new(state.pool());
            let count = repo.count_matching(&filter).await.gql()?;
            let total = to_usize(count);
            let (start, end) = window(after, before, first, last, total);
            let (ids, _) = repo
                .list_range(&filter, to_i64(start), to_i64(end - start))
                .await
                .gql()?;
            let records = repo.load(&ids, request.translation()).await.gql()?;

            let mut connection = Connection::with_additional_fields(
                start > 0,
                end < total,
                ConnectionTotal { total_count: count },
            );
            for (offset, record) in (start..).zip(records) {
                let node = Product(present(state, request, record).await);
                connection.edges.push(Edge::new(offset, node));
            }
            Ok::<_, async_graphql::Error>(connection)
        })
        .await
    }

    async fn category(&self, ctx: &Context<'_>, id: i32) -> Result<Option<CategoryNode>> {
        let (state, request) = request_parts(ctx)?;
        let category = CategoryRepository::new(state.pool())
            .get(CategoryId::new(id), request.translation())
            .await
            .gql()?;
        Ok(category.map(CategoryNode))
    }

    /// Categories as a flat connection, optionally only children of `parent`.
    async fn categories(
        &self,
        ctx: &Context<'_>,
        after: Option<String>,
        before: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        parent: Option<i32>,
    ) -> Result<CategoryConnection> {
        let (state, request) = request_parts(ctx)?;
        let mut categories = CategoryRepository::new(state.pool())
            .all(request.translation())
            .await
            .gql()?;
        if let Some(parent) = parent.map(CategoryId::new) {
            categories.retain(|c| c.parent_id == Some(parent));
        }

        query(after, before, first, last, |after, before, first, last| async move {
            let total = categories.len();
            let (start, end) = window(after, before, first, last, total);
            let mut connection = Connection::with_additional_fields(
                start > 0,
                end < total,
                ConnectionTotal {
                    total_count: to_i64(total),
                },
            );
            connection.edges.extend(
                (start..end)
                    .zip(categories.into_iter().skip(start))
                    .map(|(offset, category)| Edge::new(offset, CategoryNode(category))),
            );
            Ok::<_, async_graphql::Error>(connection)
        })
        .await
    }

    /// The whole category hierarchy.
    async fn category_tree(&self, ctx: &Context<'_>) -> Result<Vec<CategoryTree>> {
        let (state, request) = request_parts(ctx)?;
        let categories = CategoryRepository::new(state.pool())
            .all(request.translation())
            .await
            .gql()?;
        Ok(build_tree(categories).into_iter().map(CategoryTree::from).collect())
    }

    async fn collections(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Vec<CollectionNode>> {
        let (state, _) = request_parts(ctx)?;
        let (collections, _) = CollectionRepository::new(state.pool())
            .list(PageRequest { page, page_size })
            .await
            .gql()?;
        Ok(collections.into_iter().map(CollectionNode).collect())
    }

    async fn tags(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Vec<TagNode>> {
        let (state, _) = request_parts(ctx)?;
        let (tags, _) = TagRepository::new(state.pool())
            .list(PageRequest { page, page_size })
            .await
            .gql()?;
        Ok(tags.into_iter().map(TagNode).collect())
    }

    async fn suppliers(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Vec<SupplierNode>> {
        let (state, _) = request_parts(ctx)?;
        let (suppliers, _) = SupplierRepository::new(state.pool())
            .list(PageRequest { page, page_size })
            .await
            .gql()?;
        Ok(suppliers.into_iter().map(SupplierNode).collect())
    }

    async fn tax_classes(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Vec<TaxClassNode>> {
        let (state, _) = request_parts(ctx)?;
        let (classes, _) = TaxRepository::new(state.pool())
            .list_classes(PageRequest { page, page_size })
            .await
            .gql()?;
        Ok(classes.into_iter().map(TaxClassNode).collect())
    }
}
