//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-class errors are
//! captured to Sentry and logged before the response is built; their
//! details never reach the client.
//!
//! Response bodies are JSON: field errors as `{"errors": {field: [..]}}`,
//! everything else as `{"detail": ".."}`.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use async_graphql::ErrorExtensions;
use axum::Json;
use emporium_core::ValidationErrors;
use emporium_core::validation::NON_FIELD_ERRORS;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::bundle::BundleError;
use crate::services::currency::CurrencyError;
use crate::services::storage::StorageError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Payload failed field validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Rate lookup or conversion failed.
    #[error("Currency error: {0}")]
    Currency(#[from] CurrencyError),

    /// Media storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Admin bundle installation failed.
    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    /// Missing or invalid credentials.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Authenticated, but the role lacks a permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Upload exceeded the route's body limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(err.body_text())
        } else {
            Self::BadRequest(err.body_text())
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        Self::NotFound("no such resource".to_string())
    }
}

impl AppError {
    /// Shorthand for a single field error.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict { .. } | RepositoryError::Invalid(_) => {
                    StatusCode::BAD_REQUEST
                }
                RepositoryError::Protected(_) => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Currency(err) => match err {
                CurrencyError::MissingRate { .. } => StatusCode::SERVICE_UNAVAILABLE,
                CurrencyError::Source(_) | CurrencyError::Http(_) => StatusCode::BAD_GATEWAY,
                CurrencyError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CurrencyError::Overflow => StatusCode::BAD_REQUEST,
            },
            Self::Storage(err) => match err {
                StorageError::InvalidName(_) => StatusCode::BAD_REQUEST,
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Http(_) | StorageError::Api { .. } => StatusCode::BAD_GATEWAY,
                StorageError::Io(_) | StorageError::NameExhausted(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Bundle(err) => match err {
                BundleError::InvalidArchive(_)
                | BundleError::UnsafePath(_)
                | BundleError::Empty
                | BundleError::TooLarge => StatusCode::BAD_REQUEST,
                BundleError::Io(_) | BundleError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Auth(AuthError::InvalidKey) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    fn body(&self, status: StatusCode) -> serde_json::Value {
        match self {
            Self::Validation(errors) | Self::Database(RepositoryError::Invalid(errors)) => {
                json!({ "errors": errors })
            }
            Self::Database(RepositoryError::Conflict { field, message }) => {
                json!({ "errors": ValidationErrors::single(field.as_str(), message.as_str()) })
            }
            Self::Bundle(err) if status == StatusCode::BAD_REQUEST => {
                json!({ "errors": ValidationErrors::single("bundle", err.to_string()) })
            }
            Self::Storage(StorageError::InvalidName(_)) => {
                json!({ "errors": ValidationErrors::single(NON_FIELD_ERRORS, "invalid file name") })
            }
            _ if status.is_server_error() => {
                let detail = match status {
                    StatusCode::BAD_GATEWAY => "External service error",
                    StatusCode::SERVICE_UNAVAILABLE => "Exchange rate unavailable",
                    _ => "Internal server error",
                };
                json!({ "detail": detail })
            }
            Self::Database(RepositoryError::NotFound) => json!({ "detail": "Not found" }),
            Self::Database(RepositoryError::Protected(message))
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::BadRequest(message)
            | Self::PayloadTooLarge(message) => json!({ "detail": message }),
            Self::Auth(_) => json!({ "detail": "Authentication credentials were not provided or are invalid" }),
            _ => json!({ "detail": self.to_string() }),
        }
    }

    /// Capture server errors to Sentry and log them.
    fn report(&self, status: StatusCode) {
        if status.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }

    /// Convert into a GraphQL error. The HTTP status is exposed as the
    /// `status` extension and field errors as `fields`.
    #[must_use]
    pub fn into_graphql(self) -> async_graphql::Error {
        let status = self.status();
        self.report(status);
        let body = self.body(status);
        let message = body
            .get("detail")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Validation failed")
            .to_string();
        let fields = body
            .get("errors")
            .cloned()
            .and_then(|errors| async_graphql::Value::from_json(errors).ok());
        async_graphql::Error::new(message).extend_with(|_, extensions| {
            extensions.set("status", status.as_u16());
            if let Some(fields) = fields {
                extensions.set("fields", fields);
            }
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        self.report(status);

        let body = self.body(status);
        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor whose rejections render as [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor; unparseable ids render as 404.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::field("sku", "duplicate")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(
                RepositoryError::Conflict {
                    field: "sku".to_string(),
                    message: "taken".to_string(),
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::Protected("category".to_string()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_string()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_conflict_body_names_field() {
        let err = AppError::from(RepositoryError::Conflict {
            field: "sku".to_string(),
            message: "a record with this sku already exists".to_string(),
        });
        let body = err.body(err.status());
        assert_eq!(
            body,
            json!({ "errors": { "sku": ["a record with this sku already exists"] } })
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let err = AppError::Internal("connection string leaked".to_string());
        let body = err.body(err.status());
        assert_eq!(body, json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn test_missing_rate_is_unavailable() {
        let err = AppError::from(CurrencyError::MissingRate {
            base: emporium_core::CurrencyCode::USD,
            target: emporium_core::CurrencyCode::JPY,
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_graphql_errors_keep_client_message() {
        let err = AppError::Forbidden("not allowed".to_string()).into_graphql();
        assert_eq!(err.message, "not allowed");
        assert!(err.extensions.is_some());

        let err = AppError::Internal("secret".to_string()).into_graphql();
        assert_eq!(err.message, "Internal server error");

        let err = AppError::field("name", "required").into_graphql();
        assert_eq!(err.message, "Validation failed");
    }
}
