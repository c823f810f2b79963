//! API route definitions

use crate::auth::middleware::auth_guard;
use crate::handlers::{admin, auth, health, rooms};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_handler,
        auth::register_handler,
        auth::login_handler,
        auth::google_login_handler,
        auth::refresh_handler,
        auth::forgot_password_handler,
        auth::change_password_handler,
        auth::me_handler,
        rooms::create_room_handler,
        rooms::my_rooms_handler,
        rooms::room_details_handler,
        rooms::update_room_handler,
        rooms::join_room_handler,
        rooms::leave_room_handler,
        rooms::delete_room_handler,
        admin::user_type_handler,
        admin::promote_handler,
        admin::demote_handler,
    ),
    components(schemas(
        crate::error::ApiError,
        crate::handlers::MessageResponse,
        crate::handlers::health::HealthResponse,
        crate::handlers::admin::UserTypeResponse,
        crate::auth::LoginRequest,
        crate::auth::GoogleLoginRequest,
        crate::auth::ProfilePhotoUpload,
        crate::auth::RegisterRequest,
        crate::auth::RegisterResponse,
        crate::auth::ForgotPasswordRequest,
        crate::auth::ChangePasswordRequest,
        crate::auth::RefreshRequest,
        crate::auth::TokenResponse,
        crate::rooms::CreateRoomRequest,
        crate::rooms::UpdateRoomRequest,
        crate::rooms::JoinRoomRequest,
        crate::rooms::JoinRoomResponse,
        crate::rooms::RoomResponse,
        crate::rooms::RoomWithMembers,
        crate::rooms::MemberInfo,
        hearth_core::models::User,
        hearth_core::models::UserRole,
        hearth_core::models::Room,
        hearth_core::models::RoomMember,
        hearth_core::models::RoomRole,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication and password flows"),
        (name = "rooms", description = "Room lifecycle and membership"),
        (name = "users", description = "User administration"),
        (name = "health", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/google", post(auth::google_login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/password/forgot", post(auth::forgot_password_handler))
        .route("/auth/password/change", post(auth::change_password_handler));

    // Protected routes (valid access token required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/rooms",
            post(rooms::create_room_handler).get(rooms::my_rooms_handler),
        )
        .route("/rooms/join", post(rooms::join_room_handler))
        .route(
            "/rooms/:id",
            get(rooms::room_details_handler)
                .put(rooms::update_room_handler)
                .delete(rooms::delete_room_handler),
        )
        .route("/rooms/:id/leave", delete(rooms::leave_room_handler))
        .route("/users/:id/type", get(admin::user_type_handler))
        .route("/users/:id/promote", post(admin::promote_handler))
        .route("/users/:id/demote", post(admin::demote_handler))
        .route_layer(middleware::from_fn_with_state(state, auth_guard));

    Router::new().merge(public_routes).merge(protected_routes)
}
