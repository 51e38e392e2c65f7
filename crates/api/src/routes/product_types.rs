//! Product type route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::ProductTypeId;
use emporium_core::catalog::{Page, PageRequest};
use tracing::instrument;

use crate::db::ProductTypeRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogWrite;
use crate::models::{ProductType, ProductTypeInput};
use crate::state::AppState;

/// `GET /api/product-types`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<ProductType>>> {
    let (product_types, count) = ProductTypeRepository::new(state.pool()).list(page).await?;
    Ok(Json(Page::new(product_types, count, page)))
}

/// `POST /api/product-types`
#[instrument(skip(state, input))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductTypeInput>,
) -> Result<(StatusCode, Json<ProductType>)> {
    input.validate(true).into_result()?;
    let product_type = ProductTypeRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_type_id = %product_type.id, "Product type created");
    Ok((StatusCode::CREATED, Json(product_type)))
}

/// `GET /api/product-types/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductTypeId>,
) -> Result<Json<ProductType>> {
    ProductTypeRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product type {id}")))
}

/// `PATCH /api/product-types/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductTypeId>,
    ApiJson(input): ApiJson<ProductTypeInput>,
) -> Result<Json<ProductType>> {
    input.validate(false).into_result()?;
    let product_type = ProductTypeRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product_type))
}

/// `DELETE /api/product-types/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductTypeId>,
) -> Result<StatusCode> {
    ProductTypeRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_type_id = %id, "Product type deleted");
    Ok(StatusCode::NO_CONTENT)
}
