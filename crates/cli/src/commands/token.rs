//! Bearer token issuing.
//!
//! # Usage
//!
//! ```bash
//! emp-cli token issue --role manager --days 30
//! ```
//!
//! Tokens are signed with `EMPORIUM_API_SECRET`; the server only needs the
//! same secret to accept them.

use chrono::Duration;
use emporium_api::services::auth::{AuthError, TokenSigner};
use emporium_core::Role;
use secrecy::SecretString;
use thiserror::Error;

use super::SetupError;

/// Longest lifetime the CLI will issue.
pub const MAX_DAYS: u32 = 365;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Setup(#[from] SetupError),

    #[error("Invalid role: {0}")]
    InvalidRole(String),

    #[error("Token lifetime must be between 1 and {MAX_DAYS} days")]
    InvalidLifetime,

    #[error("Signing failed: {0}")]
    Auth(#[from] AuthError),
}

fn secret() -> Result<SecretString, SetupError> {
    dotenvy::dotenv().ok();
    std::env::var("EMPORIUM_API_SECRET")
        .map(SecretString::from)
        .map_err(|_| SetupError::MissingEnvVar("EMPORIUM_API_SECRET"))
}

/// Sign a token for `role` with `secret`.
///
/// # Errors
///
/// Returns error for unknown roles, out-of-range lifetimes, or signing failures.
pub fn issue_with(secret: SecretString, role: &str, days: u32) -> Result<String, TokenError> {
    let role: Role = role.parse().map_err(TokenError::InvalidRole)?;
    if days == 0 || days > MAX_DAYS {
        return Err(TokenError::InvalidLifetime);
    }
    let token = TokenSigner::new(secret).issue(role, Duration::days(i64::from(days)))?;
    tracing::info!(role = %role, days, "Token issued");
    Ok(token)
}

/// Issue a token and print it to stdout.
///
/// # Errors
///
/// Returns error if the secret is missing or the token cannot be issued.
#[allow(clippy::print_stdout)]
pub fn issue(role: &str, days: u32) -> Result<(), TokenError> {
    let token = issue_with(secret()?, role, days)?;
    println!("{token}");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_secret() -> SecretString {
        SecretString::from("cli-test-secret".to_string())
    }

    #[test]
    fn test_issued_token_verifies() {
        let token = issue_with(test_secret(), "editor", 7).unwrap();
        let principal = TokenSigner::new(test_secret()).verify(&token).unwrap();
        assert_eq!(principal.role, Role::Editor);
    }

    #[test]
    fn test_rejects_unknown_role() {
        assert!(matches!(
            issue_with(test_secret(), "owner", 7),
            Err(TokenError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_rejects_bad_lifetime() {
        assert!(matches!(
            issue_with(test_secret(), "staff", 0),
            Err(TokenError::InvalidLifetime)
        ));
        assert!(matches!(
            issue_with(test_secret(), "staff", MAX_DAYS + 1),
            Err(TokenError::InvalidLifetime)
        ));
    }
}
