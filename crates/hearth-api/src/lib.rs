//! Hearth API - REST server
//!
//! Authentication (password and Google-federated), password-reset flows,
//! and code-joinable rooms with role-based membership.

pub mod auth;
pub mod error;
pub mod files;
pub mod handlers;
pub mod mail;
pub mod rooms;
pub mod routes;
pub mod state;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // Development default
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", routes::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
