//! User administration handlers
//!
//! Promotion and demotion act on the global role, an axis orthogonal to
//! per-room roles, and require a globally-admin caller.

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::handlers::MessageResponse;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// User type response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserTypeResponse {
    pub user_type: String,
    pub user_id: Uuid,
}

fn require_admin(current: &CurrentUser) -> Result<(), AppError> {
    if current.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}

/// Whether a user is a global admin
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/type",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User type", body = UserTypeResponse),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn user_type_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user_type = state.auth_service().user_type(id).await?;
    Ok(Json(UserTypeResponse {
        user_type: user_type.to_string(),
        user_id: id,
    }))
}

/// Grant the global admin role
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/promote",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Promoted", body = MessageResponse),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "Already an admin", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn promote_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&current)?;
    state.auth_service().promote_to_admin(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "User {id} promoted to admin successfully"
    ))))
}

/// Revoke the global admin role
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/demote",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Demoted", body = MessageResponse),
        (status = 400, description = "User is not an admin", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn demote_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&current)?;
    state.auth_service().demote_to_user(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "User {id} demoted to regular user successfully"
    ))))
}
