//! Exchange-rate maintenance.
//!
//! # Usage
//!
//! ```bash
//! emp-cli rates refresh
//! ```
//!
//! Fetches rates for the configured base currency from the configured source
//! (`EMPORIUM_RATES_URL`, or the fixed table) and stores them. The server
//! loads stored rates on startup.

use emporium_api::services::currency::CurrencyError;
use thiserror::Error;

use super::SetupError;

#[derive(Debug, Error)]
pub enum RatesError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Rate refresh failed: {0}")]
    Currency(#[from] CurrencyError),
}

/// Fetch and store fresh rates. Returns how many were stored.
///
/// # Errors
///
/// Returns error if setup, the rate source, or the database write fails.
pub async fn refresh() -> Result<usize, RatesError> {
    let state = super::load_state().await?;
    let currency = state.currency();

    tracing::info!(source = currency.source_name(), "Refreshing exchange rates...");
    let count = currency.refresh().await?;
    tracing::info!(count, "Exchange rates stored");

    Ok(count)
}
