//! Collection route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::CollectionId;
use emporium_core::catalog::{Page, PageRequest};
use tracing::instrument;

use crate::db::CollectionRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogWrite;
use crate::models::{Collection, CollectionInput};
use crate::state::AppState;

/// `GET /api/collections`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<Collection>>> {
    let (collections, count) = CollectionRepository::new(state.pool()).list(page).await?;
    Ok(Json(Page::new(collections, count, page)))
}

/// `POST /api/collections`
#[instrument(skip(state, input))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CollectionInput>,
) -> Result<(StatusCode, Json<Collection>)> {
    input.validate(true).into_result()?;
    let collection = CollectionRepository::new(state.pool()).create(&input).await?;
    tracing::info!(collection_id = %collection.id, "Collection created");
    Ok((StatusCode::CREATED, Json(collection)))
}

/// `GET /api/collections/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CollectionId>,
) -> Result<Json<Collection>> {
    CollectionRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("collection {id}")))
}

/// `PATCH /api/collections/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CollectionId>,
    ApiJson(input): ApiJson<CollectionInput>,
) -> Result<Json<Collection>> {
    input.validate(false).into_result()?;
    let collection = CollectionRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(collection))
}

/// `DELETE /api/collections/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CollectionId>,
) -> Result<StatusCode> {
    CollectionRepository::new(state.pool()).delete(id).await?;
    tracing::info!(collection_id = %id, "Collection deleted");
    Ok(StatusCode::NO_CONTENT)
}
