//! Authentication API handlers

use crate::auth::{
    ChangePasswordRequest, CurrentUser, ForgotPasswordRequest, GoogleLoginRequest, LoginRequest,
    RefreshRequest, RegisterRequest, RegisterResponse, TokenResponse,
};
use crate::error::AppError;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use std::sync::Arc;

/// Register a new user account
///
/// The optional profile photo is a base64 payload and must be JPEG, PNG,
/// or GIF.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email already registered", body = crate::error::ApiError),
        (status = 415, description = "Unsupported photo type", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service().register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service().login(request).await?;
    Ok(Json(response))
}

/// Login with a Google ID token
///
/// Unknown emails are auto-provisioned with the "Verified Email" role.
#[utoipa::path(
    post,
    path = "/api/v1/auth/google",
    tag = "auth",
    request_body = GoogleLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid Google token", body = crate::error::ApiError),
    )
)]
pub async fn google_login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GoogleLoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service().google_login(request).await?;
    Ok(Json(response))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed", body = TokenResponse),
        (status = 401, description = "Invalid or expired refresh token", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service().refresh(request).await?;
    Ok(Json(response))
}

/// Request a password-reset mail
///
/// Responds with the same message whether or not the account exists.
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/forgot",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageResponse),
    )
)]
pub async fn forgot_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.auth_service().forgot_password(request).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/api/v1/auth/password/change",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Invalid or expired reset token", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.auth_service().change_password(request).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user profile", body = hearth_core::models::User),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth_service().get_user(current.id).await?;
    Ok(Json(user))
}
