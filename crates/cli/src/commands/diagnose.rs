//! Check that the configured dependencies are reachable.
//!
//! # Usage
//!
//! ```bash
//! emp-cli diagnose
//! ```
//!
//! Loads the same configuration as the server and checks the database,
//! the media storage backend, and exchange-rate coverage for every
//! configured currency. Exits non-zero when any check fails.

use bytes::Bytes;
use emporium_api::db::{CategoryRepository, ExchangeRateRepository, ProductRepository};
use emporium_api::state::AppState;
use emporium_core::CurrencyCode;
use thiserror::Error;

use super::SetupError;

#[derive(Debug, Error)]
pub enum DiagnoseError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("{0} of {1} checks failed")]
    Failed(usize, usize),
}

/// Outcome of one check.
#[derive(Debug)]
pub struct Check {
    pub name: &'static str,
    pub result: Result<String, String>,
}

impl Check {
    fn log(&self) {
        match &self.result {
            Ok(detail) => tracing::info!(check = self.name, "OK: {detail}"),
            Err(detail) => tracing::error!(check = self.name, "FAILED: {detail}"),
        }
    }
}

async fn check_database(state: &AppState) -> Check {
    let pool = state.pool();
    let result = async {
        let products = ProductRepository::new(pool).count().await?;
        let categories = CategoryRepository::new(pool).count().await?;
        Ok::<_, emporium_api::db::RepositoryError>(format!(
            "{products} products, {categories} categories"
        ))
    }
    .await
    .map_err(|e| e.to_string());

    Check {
        name: "database",
        result,
    }
}

async fn check_storage(state: &AppState) -> Check {
    let storage = state.storage();
    let probe = format!("diagnostics/probe-{}.txt", uuid::Uuid::new_v4());

    let result = async {
        let name = storage.save(&probe, Bytes::from_static(b"ok")).await?;
        let found = storage.exists(&name).await?;
        storage.delete(&name).await?;
        Ok::<_, emporium_api::services::storage::StorageError>(found)
    }
    .await;

    let result = match result {
        Ok(true) => Ok(format!("{} backend writable", storage.backend())),
        Ok(false) => Err(format!("{} backend lost the probe file", storage.backend())),
        Err(e) => Err(e.to_string()),
    };

    Check {
        name: "storage",
        result,
    }
}

/// Configured currencies with no stored rate against `base`.
fn missing_currencies(
    base: CurrencyCode,
    configured: &[CurrencyCode],
    stored: &[CurrencyCode],
) -> Vec<CurrencyCode> {
    configured
        .iter()
        .copied()
        .filter(|code| *code != base && !stored.contains(code))
        .collect()
}

async fn check_rates(state: &AppState) -> Check {
    let locale = &state.config().locale;
    let stored = ExchangeRateRepository::new(state.pool())
        .list_rates(locale.base_currency)
        .await;

    let result = match stored {
        Ok(rates) => {
            let targets: Vec<CurrencyCode> = rates.iter().map(|r| r.target).collect();
            let missing = missing_currencies(locale.base_currency, &locale.currencies, &targets);
            if missing.is_empty() {
                Ok(format!(
                    "{} rates from {} ({})",
                    targets.len(),
                    locale.base_currency,
                    state.currency().source_name()
                ))
            } else {
                let codes: Vec<&str> = missing.iter().map(|c| c.code()).collect();
                Err(format!(
                    "no stored rate for {}; run `emp-cli rates refresh`",
                    codes.join(", ")
                ))
            }
        }
        Err(e) => Err(e.to_string()),
    };

    Check {
        name: "exchange rates",
        result,
    }
}

/// Run every check and log the outcome.
///
/// # Errors
///
/// Returns `DiagnoseError::Failed` when any check fails.
pub async fn run() -> Result<Vec<Check>, DiagnoseError> {
    let state = super::load_state().await?;

    let checks = vec![
        check_database(&state).await,
        check_storage(&state).await,
        check_rates(&state).await,
    ];
    for check in &checks {
        check.log();
    }

    let failed = checks.iter().filter(|c| c.result.is_err()).count();
    if failed > 0 {
        return Err(DiagnoseError::Failed(failed, checks.len()));
    }
    Ok(checks)
}
