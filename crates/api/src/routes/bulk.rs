//! Bulk product operations.
//!
//! Both endpoints apply to every listed product in one transaction and
//! require `CatalogBulk`, which single-record editors do not have.

use axum::{Json, extract::State};
use emporium_core::{ProductId, ProductStatus, ValidationErrors};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::products::delete_files;
use crate::db::{ImageRepository, ProductRepository};
use crate::error::{ApiJson, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogBulk;
use crate::state::AppState;

/// Most products one bulk request may touch.
pub const MAX_BULK_IDS: usize = 500;

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<ProductId>,
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<ProductId>,
}

/// How many products a bulk request changed.
#[derive(Debug, Serialize)]
pub struct BulkResult {
    pub requested: usize,
    pub affected: u64,
}

/// Deduplicate and bound the id list.
fn check_ids(ids: &[ProductId]) -> std::result::Result<Vec<ProductId>, ValidationErrors> {
    if ids.is_empty() {
        return Err(ValidationErrors::single("ids", "at least one id is required"));
    }
    let mut unique = ids.to_vec();
    unique.sort_unstable();
    unique.dedup();
    if unique.len() > MAX_BULK_IDS {
        return Err(ValidationErrors::single(
            "ids",
            format!("at most {MAX_BULK_IDS} ids per request"),
        ));
    }
    Ok(unique)
}

/// `POST /api/products/bulk/status`
#[instrument(skip(state, request), fields(count = request.ids.len(), status = %request.status))]
pub async fn set_status(
    _: RequirePermission<CatalogBulk>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkStatusRequest>,
) -> Result<Json<BulkResult>> {
    let ids = check_ids(&request.ids)?;
    let affected = ProductRepository::new(state.pool())
        .bulk_set_status(&ids, request.status)
        .await?;
    tracing::info!(affected, "Bulk status change applied");
    Ok(Json(BulkResult {
        requested: ids.len(),
        affected,
    }))
}

/// `POST /api/products/bulk/delete`
#[instrument(skip(state, request), fields(count = request.ids.len()))]
pub async fn delete(
    _: RequirePermission<CatalogBulk>,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BulkDeleteRequest>,
) -> Result<Json<BulkResult>> {
    let ids = check_ids(&request.ids)?;
    let raw: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let paths = ImageRepository::new(state.pool())
        .paths_for_products(&raw)
        .await?;
    let affected = ProductRepository::new(state.pool()).bulk_delete(&ids).await?;
    delete_files(&state, &paths).await;
    tracing::info!(affected, "Bulk delete applied");
    Ok(Json(BulkResult {
        requested: ids.len(),
        affected,
    }))
}
