//! Authorization guard for protected routes
//!
//! Extracts the bearer token from the Authorization header, verifies it
//! as an access token, and resolves it to a live user record before the
//! request reaches business logic. On success the user is available to
//! handlers through `Extension<CurrentUser>`.

use crate::auth::token::{self, TokenError, TokenPurpose};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use hearth_core::{UserRole, UserStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Authenticated identity resolved from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: UserRole,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Guard rejection reasons
#[derive(Debug, Error)]
pub enum AuthGuardError {
    #[error("Missing Authorization header")]
    MissingAuthHeader,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Could not validate credentials")]
    UnknownUser,

    #[error("storage error: {0}")]
    Store(String),
}

impl IntoResponse for AuthGuardError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthGuardError::MissingAuthHeader => {
                (StatusCode::UNAUTHORIZED, "Missing Authorization header")
            }
            AuthGuardError::InvalidAuthHeader => (
                StatusCode::UNAUTHORIZED,
                "Invalid Authorization header format",
            ),
            AuthGuardError::InvalidToken(TokenError::ExpiredToken) => {
                (StatusCode::UNAUTHORIZED, "Token expired")
            }
            AuthGuardError::InvalidToken(_) => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthGuardError::UnknownUser => {
                (StatusCode::UNAUTHORIZED, "Could not validate credentials")
            }
            AuthGuardError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Middleware that requires a valid access token
pub async fn auth_guard(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthGuardError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthGuardError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthGuardError::InvalidAuthHeader)?;

    let bearer = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthGuardError::InvalidAuthHeader)?;

    let claims = match token::verify(&state.config.auth, bearer, TokenPurpose::Access) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(reason = %e, "rejected bearer token");
            return Err(AuthGuardError::InvalidToken(e));
        }
    };

    // The subject must still resolve to a live account.
    let user = state
        .users
        .find_by_email(&claims.sub)
        .await
        .map_err(|e| AuthGuardError::Store(e.to_string()))?
        .ok_or(AuthGuardError::UnknownUser)?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_is_admin() {
        let admin = CurrentUser {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            name: Some("Admin".to_string()),
            role: UserRole::Admin,
        };
        let user = CurrentUser {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            name: None,
            role: UserRole::VerifiedEmail,
        };

        assert!(admin.is_admin());
        assert!(!user.is_admin());
    }

    #[test]
    fn test_guard_error_statuses() {
        assert_eq!(
            AuthGuardError::MissingAuthHeader.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthGuardError::InvalidToken(TokenError::ExpiredToken)
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthGuardError::UnknownUser.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
