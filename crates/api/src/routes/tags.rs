//! Tag route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::TagId;
use emporium_core::catalog::{Page, PageRequest};
use tracing::instrument;

use crate::db::TagRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogWrite;
use crate::models::{Tag, TagInput};
use crate::state::AppState;

/// `GET /api/tags`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<Tag>>> {
    let (tags, count) = TagRepository::new(state.pool()).list(page).await?;
    Ok(Json(Page::new(tags, count, page)))
}

/// `POST /api/tags`
#[instrument(skip(state, input))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TagInput>,
) -> Result<(StatusCode, Json<Tag>)> {
    input.validate(true).into_result()?;
    let tag = TagRepository::new(state.pool()).create(&input).await?;
    tracing::info!(tag_id = %tag.id, "Tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /api/tags/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TagId>,
) -> Result<Json<Tag>> {
    TagRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("tag {id}")))
}

/// `PATCH /api/tags/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TagId>,
    ApiJson(input): ApiJson<TagInput>,
) -> Result<Json<Tag>> {
    input.validate(false).into_result()?;
    let tag = TagRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(tag))
}

/// `DELETE /api/tags/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TagId>,
) -> Result<StatusCode> {
    TagRepository::new(state.pool()).delete(id).await?;
    tracing::info!(tag_id = %id, "Tag deleted");
    Ok(StatusCode::NO_CONTENT)
}
