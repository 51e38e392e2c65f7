//! Root mutation object.
//!
//! Every mutation checks the caller's permission and clears the page cache
//! on success; the REST cache layer does not see GraphQL writes.

use async_graphql::{Context, InputObject, Object, Result};
use emporium_core::{CategoryId, Permission, ProductId, VariantId};

use super::types::{CategoryNode, Product, Status};
use super::{GraphQLResultExt, request_parts, require};
use crate::db::{CategoryRepository, ProductRepository, RepositoryError, VariantRepository};
use crate::error::AppError;
use crate::models::CategoryInput;
use crate::routes::products::present;

#[derive(InputObject, Debug)]
pub struct CategoryCreateInput {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub parent_id: Option<i32>,
    pub description: Option<String>,
    #[graphql(default)]
    pub position: i32,
}

impl From<CategoryCreateInput> for CategoryInput {
    fn from(input: CategoryCreateInput) -> Self {
        Self {
            name: input.name,
            slug: input.slug,
            parent_id: input.parent_id.map(CategoryId::new),
            description: input.description,
            position: input.position,
        }
    }
}

pub struct Mutation;

#[Object]
impl Mutation {
    /// Create a category.
    async fn category_create(
        &self,
        ctx: &Context<'_>,
        input: CategoryCreateInput,
    ) -> Result<CategoryNode> {
        require(ctx, Permission::CatalogWrite)?;
        let (state, _) = request_parts(ctx)?;
        let input = CategoryInput::from(input);
        input
            .validate()
            .into_result()
            .map_err(|errors| AppError::from(errors).into_graphql())?;
        let category = CategoryRepository::new(state.pool())
            .create(&input)
            .await
            .gql()?;
        state.page_cache().clear();
        tracing::info!(category_id = %category.id, "Category created via GraphQL");
        Ok(CategoryNode(category))
    }

    /// Change a product's publication status.
    async fn product_status_update(
        &self,
        ctx: &Context<'_>,
        id: i32,
        status: Status,
    ) -> Result<Product> {
        require(ctx, Permission::CatalogWrite)?;
        let (state, request) = request_parts(ctx)?;
        let id = ProductId::new(id);
        let repo = ProductRepository::new(state.pool());
        repo.set_status(id, status.into()).await.gql()?;
        state.page_cache().clear();
        let record = repo
            .get(id, request.translation())
            .await
            .gql()?
            .ok_or(RepositoryError::NotFound)
            .gql()?;
        tracing::info!(product_id = %id, status = ?status, "Product status updated via GraphQL");
        Ok(Product(present(state, request, record).await))
    }

    /// Delete a variant. Returns the deleted id.
    async fn variant_delete(&self, ctx: &Context<'_>, id: i32) -> Result<i32> {
        require(ctx, Permission::CatalogWrite)?;
        let (state, _) = request_parts(ctx)?;
        VariantRepository::new(state.pool())
            .delete(VariantId::new(id))
            .await
            .gql()?;
        state.page_cache().clear();
        Ok(id)
    }
}
