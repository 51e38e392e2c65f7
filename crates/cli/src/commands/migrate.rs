//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! emp-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `EMPORIUM_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migrations live in `crates/api/migrations/` and are embedded at compile
//! time. The server never runs them itself.

use thiserror::Error;

use super::SetupError;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns error if the connection fails or a migration cannot be applied.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    let migrator = sqlx::migrate!("../api/migrations");
    tracing::info!(available = migrator.iter().count(), "Running migrations...");
    migrator.run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
