//! Stateless bearer tokens.
//!
//! A token is `role.expiry.signature`, where `expiry` is a Unix timestamp in
//! seconds and `signature` is the hex HMAC-SHA256 of `role.expiry` keyed with
//! the API secret. Tokens are issued by `emp-cli token issue`.

mod error;

pub use error::AuthError;

use chrono::{DateTime, Duration, Utc};
use emporium_core::{Permission, Role};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// The caller a verified token describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    #[must_use]
    pub fn has(&self, permission: Permission) -> bool {
        self.role.has(permission)
    }
}

/// Issues and verifies bearer tokens with the API secret.
#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl TokenSigner {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn sign(&self, payload: &str) -> Result<String, AuthError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| AuthError::InvalidKey)?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Issue a token for `role` valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the MAC rejects the secret.
    pub fn issue(&self, role: Role, ttl: Duration) -> Result<String, AuthError> {
        self.issue_at(role, Utc::now() + ttl)
    }

    /// Issue a token for `role` expiring at `expires_at`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidKey` if the MAC rejects the secret.
    pub fn issue_at(&self, role: Role, expires_at: DateTime<Utc>) -> Result<String, AuthError> {
        let payload = format!("{role}.{}", expires_at.timestamp());
        let signature = self.sign(&payload)?;
        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token and return the principal it names.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed, forged, or expired token.
    pub fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let (payload, signature) = token.trim().rsplit_once('.').ok_or(AuthError::Malformed)?;
        let (role, expiry) = payload.split_once('.').ok_or(AuthError::Malformed)?;

        let expected = self.sign(payload)?;
        if !constant_time_compare(&expected, signature) {
            return Err(AuthError::InvalidSignature);
        }

        let expiry: i64 = expiry.parse().map_err(|_| AuthError::Malformed)?;
        let expires_at = DateTime::from_timestamp(expiry, 0).ok_or(AuthError::Malformed)?;
        if expires_at <= now {
            return Err(AuthError::Expired);
        }
        let role: Role = role
            .parse()
            .map_err(|_| AuthError::UnknownRole(role.to_string()))?;

        Ok(Principal { role, expires_at })
    }
}

/// Constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
