//! Bearer token extractors.
//!
//! Handlers that mutate state take a [`RequirePermission`] parameterized by a
//! permission marker; read handlers that behave differently for staff take
//! [`OptionalPrincipal`].
//!
//! ```rust,ignore
//! async fn create(
//!     _: RequirePermission<CatalogWrite>,
//!     State(state): State<AppState>,
//! ) -> Result<..> { .. }
//! ```

use std::marker::PhantomData;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use emporium_core::Permission;

use crate::error::AppError;
use crate::services::auth::{AuthError, Principal};
use crate::state::AppState;

/// Type-level name of a [`Permission`].
pub trait PermissionMarker: Send + Sync {
    const PERMISSION: Permission;
}

macro_rules! permission_marker {
    ($($name:ident),+ $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy)]
            pub struct $name;

            impl PermissionMarker for $name {
                const PERMISSION: Permission = Permission::$name;
            }
        )+
    };
}

permission_marker!(CatalogWrite, CatalogBulk, TaxWrite, Staff);

/// Read the bearer token from the request, if any.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AuthError> {
    let Some(value) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value.to_str().map_err(|_| AuthError::Malformed)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(Some(token.trim()))
}

fn principal_from(parts: &Parts, state: &AppState) -> Result<Option<Principal>, AuthError> {
    let Some(token) = bearer_token(parts)? else {
        return Ok(None);
    };
    let principal = state.signer().verify(token)?;
    Ok(Some(principal))
}

/// Extractor that requires a valid token whose role grants `P`.
///
/// Missing or invalid tokens are rejected with 401, insufficient roles
/// with 403.
pub struct RequirePermission<P: PermissionMarker>(pub Principal, PhantomData<P>);

impl<P: PermissionMarker> RequirePermission<P> {
    #[must_use]
    pub const fn principal(&self) -> &Principal {
        &self.0
    }
}

impl<P: PermissionMarker> FromRequestParts<AppState> for RequirePermission<P> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts, state)?.ok_or(AuthError::MissingToken)?;
        if !principal.has(P::PERMISSION) {
            tracing::debug!(role = %principal.role, permission = ?P::PERMISSION, "Permission denied");
            return Err(AppError::Forbidden(
                "You do not have permission to perform this action".to_string(),
            ));
        }
        Ok(Self(principal, PhantomData))
    }
}

/// Extractor that optionally gets the calling principal.
///
/// Anonymous requests yield `None`; a token that is present but invalid is
/// still rejected with 401.
pub struct OptionalPrincipal(pub Option<Principal>);

impl FromRequestParts<AppState> for OptionalPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(principal_from(parts, state)?))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/products");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(None)), Ok(None));
        assert_eq!(
            bearer_token(&parts(Some("Bearer editor.1.abc"))),
            Ok(Some("editor.1.abc"))
        );
        assert_eq!(
            bearer_token(&parts(Some("bearer  editor.1.abc "))),
            Ok(Some("editor.1.abc"))
        );
        assert_eq!(
            bearer_token(&parts(Some("Basic dXNlcjpwYXNz"))),
            Err(AuthError::Malformed)
        );
        assert_eq!(bearer_token(&parts(Some("Bearer"))), Err(AuthError::Malformed));
    }

    #[test]
    fn test_markers_name_permissions() {
        assert_eq!(CatalogWrite::PERMISSION, Permission::CatalogWrite);
        assert_eq!(CatalogBulk::PERMISSION, Permission::CatalogBulk);
        assert_eq!(TaxWrite::PERMISSION, Permission::TaxWrite);
        assert_eq!(Staff::PERMISSION, Permission::Staff);
    }
}
