//! Tax class and rate route handlers.
//!
//! Reads are public; every write requires the `TaxWrite` permission.

use axum::{Json, extract::State, http::StatusCode};
use emporium_core::catalog::{Page, PageRequest, tax_amount};
use emporium_core::{CurrencyCode, Price, TaxClassId, TaxRateId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::TaxRepository;
use crate::error::{ApiJson, ApiPath, ApiQuery, AppError, Result};
use crate::middleware::RequirePermission;
use crate::middleware::auth::TaxWrite;
use crate::models::{TaxClass, TaxClassInput, TaxRate, TaxRateInput};
use crate::state::AppState;

/// A tax class with its rates.
#[derive(Debug, Serialize)]
pub struct TaxClassDetail {
    #[serde(flatten)]
    pub class: TaxClass,
    pub rates: Vec<TaxRate>,
}

/// Query parameters for `GET /api/tax-classes/{id}/lookup`.
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub country: String,
    pub state: Option<String>,
    /// When given, the response includes the tax owed on this amount.
    pub amount: Option<Decimal>,
    pub currency: Option<CurrencyCode>,
}

/// Result of a rate lookup.
#[derive(Debug, Serialize)]
pub struct LookupResult {
    pub rate: TaxRate,
    pub tax: Option<Price>,
}

async fn class_or_404(state: &AppState, id: TaxClassId) -> Result<TaxClass> {
    TaxRepository::new(state.pool())
        .get_class(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("tax class {id}")))
}

/// `GET /api/tax-classes`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageRequest>,
) -> Result<Json<Page<TaxClass>>> {
    let (classes, count) = TaxRepository::new(state.pool()).list_classes(page).await?;
    Ok(Json(Page::new(classes, count, page)))
}

/// `POST /api/tax-classes`
#[instrument(skip(state, input))]
pub async fn create(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<TaxClassInput>,
) -> Result<(StatusCode, Json<TaxClass>)> {
    input.validate(true).into_result()?;
    let class = TaxRepository::new(state.pool()).create_class(&input).await?;
    tracing::info!(tax_class_id = %class.id, "Tax class created");
    Ok((StatusCode::CREATED, Json(class)))
}

/// `GET /api/tax-classes/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
) -> Result<Json<TaxClassDetail>> {
    let class = class_or_404(&state, id).await?;
    let rates = TaxRepository::new(state.pool()).rates_for_class(id).await?;
    Ok(Json(TaxClassDetail { class, rates }))
}

/// `PATCH /api/tax-classes/{id}`
#[instrument(skip(state, input))]
pub async fn update(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
    ApiJson(input): ApiJson<TaxClassInput>,
) -> Result<Json<TaxClass>> {
    input.validate(false).into_result()?;
    Ok(Json(TaxRepository::new(state.pool()).update_class(id, &input).await?))
}

/// `DELETE /api/tax-classes/{id}`
///
/// Classes still assigned to products are protected (409).
#[instrument(skip(state))]
pub async fn delete(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
) -> Result<StatusCode> {
    TaxRepository::new(state.pool()).delete_class(id).await?;
    tracing::info!(tax_class_id = %id, "Tax class deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/tax-classes/{id}/rates`
#[instrument(skip(state))]
pub async fn rates(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
) -> Result<Json<Vec<TaxRate>>> {
    class_or_404(&state, id).await?;
    Ok(Json(TaxRepository::new(state.pool()).rates_for_class(id).await?))
}

/// `POST /api/tax-classes/{id}/rates`
#[instrument(skip(state, input))]
pub async fn create_rate(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
    ApiJson(input): ApiJson<TaxRateInput>,
) -> Result<(StatusCode, Json<TaxRate>)> {
    if query.amount.is_some_and(|amount| amount < Decimal::ZERO) {
        return Err(AppError::field("amount", "must not be negative"));
    }
    class_or_404(&state, id).await?;
    let rate = TaxRepository::new(state.pool()).create_rate(id, &input).await?;
    tracing::info!(tax_rate_id = %rate.id, country = %rate.country, "Tax rate created");
    Ok((StatusCode::CREATED, Json(rate)))
}

/// `GET /api/tax-rates/{id}`
#[instrument(skip(state))]
pub async fn show_rate(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxRateId>,
) -> Result<Json<TaxRate>> {
    TaxRepository::new(state.pool())
        .get_rate(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("tax rate {id}")))
}

/// `PATCH /api/tax-rates/{id}`
#[instrument(skip(state, input))]
pub async fn update_rate(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxRateId>,
    ApiJson(input): ApiJson<TaxRateInput>,
) -> Result<Json<TaxRate>> {
    Ok(Json(TaxRepository::new(state.pool()).update_rate(id, &input).await?))
}

/// `DELETE /api/tax-rates/{id}`
#[instrument(skip(state))]
pub async fn delete_rate(
    _: RequirePermission<TaxWrite>,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxRateId>,
) -> Result<StatusCode> {
    TaxRepository::new(state.pool()).delete_rate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/tax-classes/{id}/lookup?country=&state=`
#[instrument(skip(state))]
pub async fn lookup(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<TaxClassId>,
    ApiQuery(query): ApiQuery<LookupQuery>,
) -> Result<Json<LookupResult>> {
    if query.amount.is_some_and(|amount| amount < Decimal::ZERO) {
        return Err(AppError::field("amount", "must not be negative"));
    }
    class_or_404(&state, id).await?;
    let rate = TaxRepository::new(state.pool())
        .lookup(id, &query.country, query.state.as_deref())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no tax rate for {}", query.country)))?;
    let currency = query.currency.unwrap_or(state.config().locale.base_currency);
    let tax = query
        .amount
        .map(|amount| {
            tax_amount(&Price::new(amount, currency), rate.rate)
                .ok_or_else(|| AppError::field("amount", "is too large to tax"))
        })
        .transpose()?;
    Ok(Json(LookupResult { rate, tax }))
}
