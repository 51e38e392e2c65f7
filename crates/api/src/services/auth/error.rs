//! Token error types.

use thiserror::Error;

/// Errors that can occur when issuing or verifying bearer tokens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header was sent.
    #[error("missing bearer token")]
    MissingToken,

    /// The token is not `role.expiry.signature` shaped.
    #[error("malformed token")]
    Malformed,

    /// The signature does not match.
    #[error("invalid token signature")]
    InvalidSignature,

    /// The token's expiry is in the past.
    #[error("token expired")]
    Expired,

    /// The token names a role this server does not know.
    #[error("unknown role: {0}")]
    UnknownRole(String),

    /// The signing key was rejected by the MAC.
    #[error("invalid signing key")]
    InvalidKey,
}
