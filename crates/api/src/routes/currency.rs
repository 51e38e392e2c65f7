//! Currency route handlers.

use axum::{Json, extract::State};
use emporium_core::{CurrencyCode, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::ExchangeRateRepository;
use crate::db::currency::ExchangeRate;
use crate::error::{ApiQuery, AppError, Result};
use crate::middleware::RequestContext;
use crate::models::PriceView;
use crate::services::currency::CurrencyError;
use crate::state::AppState;

/// Query parameters for `GET /api/currencies/convert`.
#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

#[derive(Debug, Serialize)]
pub struct Conversion {
    pub amount: Decimal,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub result: PriceView,
}

/// Supported display currencies and the stored rates behind them.
#[derive(Debug, Serialize)]
pub struct CurrencyOverview {
    pub base: CurrencyCode,
    pub currencies: Vec<CurrencyCode>,
    pub source: &'static str,
    pub rates: Vec<ExchangeRate>,
}

/// `GET /api/currencies`
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<CurrencyOverview>> {
    let locale = &state.config().locale;
    let rates = ExchangeRateRepository::new(state.pool())
        .list_rates(locale.base_currency)
        .await?;
    Ok(Json(CurrencyOverview {
        base: locale.base_currency,
        currencies: locale.currencies.clone(),
        source: state.currency().source_name(),
        rates,
    }))
}

/// `GET /api/currencies/convert?amount=&from=&to=`
///
/// The converted amount is rounded to the target currency's minor unit and
/// formatted in the request language.
#[instrument(skip(state))]
pub async fn convert(
    State(state): State<AppState>,
    ctx: RequestContext,
    ApiQuery(query): ApiQuery<ConvertQuery>,
) -> Result<Json<Conversion>> {
    if query.amount < Decimal::ZERO {
        return Err(AppError::field("amount", "must not be negative"));
    }
    let converted = match state
        .currency()
        .convert(query.amount, query.from, query.to)
        .await
    {
        Err(CurrencyError::Overflow) => {
            return Err(AppError::field("amount", "is too large to convert"));
        }
        other => other?,
    };
    let price = Price::new(converted, query.to).rounded();
    let result = PriceView {
        amount: price.amount,
        currency: price.currency_code,
        formatted: emporium_core::money::format_price(&price, &ctx.language),
    };
    Ok(Json(Conversion {
        amount: query.amount,
        from: query.from,
        to: query.to,
        result,
    }))
}
