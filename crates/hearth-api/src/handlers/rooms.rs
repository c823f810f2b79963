//! Room API handlers

use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::handlers::MessageResponse;
use crate::rooms::{
    CreateRoomRequest, JoinRoomRequest, JoinRoomResponse, RoomResponse, RoomWithMembers,
    UpdateRoomRequest,
};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// Create a room; the caller becomes its owner
#[utoipa::path(
    post,
    path = "/api/v1/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = RoomResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let room = state.room_service().create(current.id, request).await?;
    Ok((StatusCode::CREATED, Json(room)))
}

/// List the caller's rooms with their members
#[utoipa::path(
    get,
    path = "/api/v1/rooms",
    tag = "rooms",
    responses(
        (status = 200, description = "Rooms the caller belongs to", body = [RoomWithMembers]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn my_rooms_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    let rooms = state.room_service().my_rooms(current.id).await?;
    Ok(Json(rooms))
}

/// Room details; members only
#[utoipa::path(
    get,
    path = "/api/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room details", body = RoomWithMembers),
        (status = 403, description = "Not a member", body = crate::error::ApiError),
        (status = 404, description = "Room not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn room_details_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let room = state.room_service().details(current.id, id).await?;
    Ok(Json(room))
}

/// Update room fields; owner or room-admin only
#[utoipa::path(
    put,
    path = "/api/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room id")),
    request_body = UpdateRoomRequest,
    responses(
        (status = 200, description = "Updated room", body = RoomResponse),
        (status = 403, description = "Insufficient room role", body = crate::error::ApiError),
        (status = 404, description = "Room not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let room = state.room_service().update(current.id, id, request).await?;
    Ok(Json(room))
}

/// Join a room by its code
#[utoipa::path(
    post,
    path = "/api/v1/rooms/join",
    tag = "rooms",
    request_body = JoinRoomRequest,
    responses(
        (status = 200, description = "Joined", body = JoinRoomResponse),
        (status = 400, description = "Room inactive, full, or already joined", body = crate::error::ApiError),
        (status = 404, description = "Unknown code", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn join_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state
        .room_service()
        .join_by_code(current.id, &request.code)
        .await?;
    Ok(Json(response))
}

/// Leave a room
///
/// A departing owner hands the room to the next owner; the last member
/// leaving deletes the room.
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{id}/leave",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room id")),
    responses(
        (status = 200, description = "Left the room", body = MessageResponse),
        (status = 400, description = "Not a member", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.room_service().leave(current.id, id).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// Delete a room; owner only
#[utoipa::path(
    delete,
    path = "/api/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = Uuid, Path, description = "Room id")),
    responses(
        (status = 200, description = "Room deleted", body = MessageResponse),
        (status = 403, description = "Caller is not the owner", body = crate::error::ApiError),
        (status = 404, description = "Room not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_room_handler(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let message = state.room_service().delete(current.id, id).await?;
    Ok(Json(MessageResponse::new(message)))
}
