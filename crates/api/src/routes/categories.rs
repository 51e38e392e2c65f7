//! Category route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::CategoryId;
use emporium_core::catalog::{Page, PageRequest, TreeNode, build_tree};
use serde::Deserialize;
use tracing::instrument;

use super::products::translation_language;
use crate::db::{CategoryRepository, RepositoryError, TranslationRepository};
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::auth::CatalogWrite;
use crate::middleware::{RequestContext, RequirePermission};
use crate::models::{Category, CategoryInput, CategoryPatch, CategoryTranslationInput};
use crate::state::AppState;

/// Query parameters for `GET /api/categories`.
#[derive(Debug, Default, Deserialize)]
pub struct CategoryListQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Only direct children of this category.
    pub parent: Option<CategoryId>,
}

/// `GET /api/categories`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> Result<Json<Page<Category>>> {
    let page = PageRequest {
        page: query.page,
        page_size: query.page_size,
    };
    let (categories, count) = CategoryRepository::new(state.pool())
        .list(page, query.parent, ctx.translation())
        .await?;
    Ok(Json(Page::new(categories, count, page)))
}

/// `GET /api/categories/tree`
#[instrument(skip(state))]
pub async fn tree(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> Result<Json<Vec<TreeNode<Category>>>> {
    let categories = CategoryRepository::new(state.pool())
        .all(ctx.translation())
        .await?;
    Ok(Json(build_tree(categories)))
}

/// `POST /api/categories`
#[instrument(skip(state, input), fields(name = %input.name))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    input.validate().into_result()?;
    let category = CategoryRepository::new(state.pool()).create(&input).await?;
    tracing::info!(category_id = %category.id, "Category created");
    Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /api/categories/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<Json<Category>> {
    let category = CategoryRepository::new(state.pool())
        .get(id, ctx.translation())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {id}")))?;
    Ok(Json(category))
}

/// `PATCH /api/categories/{id}`
#[instrument(skip(state, patch))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> Result<Json<Category>> {
    patch.validate().into_result()?;
    let category = CategoryRepository::new(state.pool()).update(id, &patch).await?;
    tracing::info!(category_id = %id, "Category updated");
    Ok(Json(category))
}

/// `DELETE /api/categories/{id}`
///
/// Categories that still hold products or children are protected (409).
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    tracing::info!(category_id = %id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /api/categories/{id}/translations/{lang}`
#[instrument(skip(state, input))]
pub async fn put_translation(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath((id, lang)): ApiPath<(CategoryId, String)>,
    ApiJson(input): ApiJson<CategoryTranslationInput>,
) -> Result<Json<Category>> {
    let language = translation_language(&state, &lang)?;
    TranslationRepository::new(state.pool())
        .upsert_category(id, &language, &input)
        .await
        .map_err(|e| match e {
            RepositoryError::Invalid(errors) if errors.contains("category_id") => {
                AppError::NotFound(format!("category {id}"))
            }
            other => other.into(),
        })?;
    let category = CategoryRepository::new(state.pool())
        .get(id, Some(&language))
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(Json(category))
}
