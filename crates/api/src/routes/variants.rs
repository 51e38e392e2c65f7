//! Variant route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::VariantId;
use emporium_core::catalog::VariantPatch;
use tracing::instrument;

use super::products::present_variant;
use crate::db::{RepositoryError, VariantRepository};
use crate::error::{ApiJson, ApiPath, Result};
use crate::middleware::auth::CatalogWrite;
use crate::middleware::{RequestContext, RequirePermission};
use crate::models::VariantView;
use crate::state::AppState;

/// `PATCH /api/variants/{id}`
///
/// Setting `is_default: true` moves the product's default to this variant.
#[instrument(skip(state, patch))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiPath(id): ApiPath<VariantId>,
    ApiJson(patch): ApiJson<VariantPatch>,
) -> Result<Json<VariantView>> {
    let repo = VariantRepository::new(state.pool());
    repo.update(id, &patch).await?;
    let variant = repo.get(id).await?.ok_or(RepositoryError::NotFound)?;
    tracing::info!(variant_id = %id, "Variant updated");
    Ok(Json(present_variant(&state, &ctx, variant).await))
}

/// `DELETE /api/variants/{id}`
///
/// The product's default variant cannot be deleted.
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<VariantId>,
) -> Result<StatusCode> {
    VariantRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
