//! CLI subcommand implementations.

pub mod diagnose;
pub mod migrate;
pub mod rates;
pub mod seed;
pub mod smoke;
pub mod token;

use emporium_api::config::{ApiConfig, ConfigError};
use emporium_api::state::{AppState, StateError};
use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

/// Errors shared by commands that need the API's configuration and state.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Application state error: {0}")]
    State(#[from] StateError),
}

/// Database URL from `EMPORIUM_DATABASE_URL`, falling back to `DATABASE_URL`.
///
/// # Errors
///
/// Returns `SetupError::MissingEnvVar` if neither is set.
pub fn database_url() -> Result<SecretString, SetupError> {
    dotenvy::dotenv().ok();
    std::env::var("EMPORIUM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| SetupError::MissingEnvVar("EMPORIUM_DATABASE_URL"))
}

/// Connect using only the database URL.
///
/// # Errors
///
/// Returns error if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, SetupError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(emporium_api::db::create_pool(&url).await?)
}

/// Load the full API configuration.
///
/// # Errors
///
/// Returns error if any required variable is missing or invalid.
pub fn load_config() -> Result<ApiConfig, SetupError> {
    dotenvy::dotenv().ok();
    Ok(ApiConfig::from_env()?)
}

/// Build the same state the server runs with.
///
/// # Errors
///
/// Returns error if configuration, connection or service setup fails.
pub async fn load_state() -> Result<AppState, SetupError> {
    let config = load_config()?;
    tracing::info!("Connecting to database...");
    let pool = emporium_api::db::create_pool(&config.database_url).await?;
    Ok(AppState::new(config, pool)?)
}
