//! Supplier route handlers.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::SupplierId;
use emporium_core::catalog::{Page, PageRequest};
use tracing::instrument;

use crate::db::SupplierRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::CatalogWrite;
use crate::models::{Supplier, SupplierInput};
use crate::state::AppState;

/// `GET /api/suppliers`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<Supplier>>> {
    let (suppliers, count) = SupplierRepository::new(state.pool()).list(page).await?;
    Ok(Json(Page::new(suppliers, count, page)))
}

/// `POST /api/suppliers`
#[instrument(skip(state, input))]
pub async fn create(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> Result<(StatusCode, Json<Supplier>)> {
    input.validate(true).into_result()?;
    let supplier = SupplierRepository::new(state.pool()).create(&input).await?;
    tracing::info!(supplier_id = %supplier.id, "Supplier created");
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// `GET /api/suppliers/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SupplierId>,
) -> Result<Json<Supplier>> {
    SupplierRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("supplier {id}")))
}

/// `PATCH /api/suppliers/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SupplierId>,
    ApiJson(input): ApiJson<SupplierInput>,
) -> Result<Json<Supplier>> {
    input.validate(false).into_result()?;
    let supplier = SupplierRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(supplier))
}

/// `DELETE /api/suppliers/{id}`
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<CatalogWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<SupplierId>,
) -> Result<StatusCode> {
    SupplierRepository::new(state.pool()).delete(id).await?;
    tracing::info!(supplier_id = %id, "Supplier deleted");
    Ok(StatusCode::NO_CONTENT)
}
