//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hearth_core::{DeliveryError, FileError, IdentityError, StoreError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
///
/// `InvalidToken` and `ExpiredToken` are refinements of the unauthorized
/// case so clients can tell a stale session from a bad one.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Unauthorized(String),
    InvalidToken,
    ExpiredToken,
    Forbidden(String),
    UnsupportedMediaType(String),
    Delivery(String),
    Database(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::not_found(&msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg))
            }
            AppError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::new("UNAUTHORIZED", msg))
            }
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::ExpiredToken => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("EXPIRED_TOKEN", "Token expired"),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, ApiError::new("FORBIDDEN", msg)),
            AppError::UnsupportedMediaType(msg) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                ApiError::new("UNSUPPORTED_MEDIA_TYPE", msg),
            ),
            AppError::Delivery(msg) => (
                StatusCode::BAD_GATEWAY,
                ApiError::new("DELIVERY_ERROR", "Mail delivery failed").with_details(msg),
            ),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("DATABASE_ERROR", "Database operation failed").with_details(msg),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::internal_error().with_details(msg),
            ),
        };

        (status, Json(error)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => AppError::Conflict(format!("Duplicate {what}")),
            StoreError::RoomFull => {
                AppError::BadRequest("Room has reached maximum member limit".to_string())
            }
            StoreError::AlreadyMember => {
                AppError::BadRequest("You are already a member of this room".to_string())
            }
            StoreError::NotFound(what) => AppError::NotFound(what.to_string()),
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::ExpiredToken => AppError::ExpiredToken,
            TokenError::Encoding(e) => AppError::Internal(format!("Failed to encode token: {e}")),
            TokenError::SystemTime(e) => AppError::Internal(format!("System time error: {e}")),
            _ => AppError::InvalidToken,
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(format!("Password handling failed: {err}"))
    }
}

impl From<DeliveryError> for AppError {
    fn from(err: DeliveryError) -> Self {
        AppError::Delivery(err.0)
    }
}

impl From<IdentityError> for AppError {
    fn from(_: IdentityError) -> Self {
        AppError::Unauthorized("Invalid Google token".to_string())
    }
}

impl From<FileError> for AppError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::UnsupportedMediaType(msg) => AppError::UnsupportedMediaType(msg),
            FileError::Io(msg) => AppError::Internal(format!("File storage failed: {msg}")),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let err: AppError = StoreError::RoomFull.into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = StoreError::Duplicate("email").into();
        assert!(matches!(err, AppError::Conflict(_)));

        let err: AppError = StoreError::NotFound("Room").into();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "Room"));
    }

    #[test]
    fn test_token_error_refinement() {
        let expired: AppError = TokenError::ExpiredToken.into();
        assert!(matches!(expired, AppError::ExpiredToken));

        let invalid: AppError = TokenError::InvalidSignature.into();
        assert!(matches!(invalid, AppError::InvalidToken));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::UnsupportedMediaType("x".into())
                .into_response()
                .status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            AppError::ExpiredToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
