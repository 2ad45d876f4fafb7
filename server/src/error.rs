//! HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use nostrauth_proto::wire::{error_codes, ErrorBody};

use crate::auth::{AuthError, RejectReason};
use crate::identity::StoreError;
use crate::password::PasswordError;

/// The one message every authentication failure reports.
pub const INVALID_CREDENTIALS: &str = "invalid credentials";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    /// Always rendered with [`INVALID_CREDENTIALS`].
    Unauthorized,
    NotFound(String),
    Conflict(String),
    RateLimited,
    Internal,
}

impl ApiError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::BadRequest(m) => {
                (StatusCode::BAD_REQUEST, error_codes::BAD_REQUEST, m.clone())
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                error_codes::UNAUTHORIZED,
                INVALID_CREDENTIALS.to_string(),
            ),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, error_codes::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, error_codes::CONFLICT, m.clone()),
            ApiError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                error_codes::RATE_LIMITED,
                "too many attempts".to_string(),
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "internal error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let body = ErrorBody {
            code: code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        if reason.is_validation() {
            ApiError::BadRequest(reason.as_str().to_string())
        } else {
            ApiError::Unauthorized
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => {
                ApiError::Conflict(format!("{field} already registered"))
            }
            StoreError::NotFound => ApiError::NotFound("identity not found".into()),
            StoreError::Database(e) => {
                tracing::error!(error = %e, "identity store failure");
                ApiError::Internal
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid(m) => ApiError::BadRequest(m.to_string()),
            AuthError::NotOwner => ApiError::Unauthorized,
            AuthError::Store(e) => e.into(),
            AuthError::Password(PasswordError::InvalidHash(e)) => {
                tracing::error!(error = %e, "stored secret hash is malformed");
                ApiError::Internal
            }
            AuthError::Password(e) => {
                tracing::error!(error = %e, "password hashing failed");
                ApiError::Internal
            }
            AuthError::Task(e) => {
                tracing::error!(error = %e, "blocking task failed");
                ApiError::Internal
            }
        }
    }
}
