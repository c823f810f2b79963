//! Hearth API Server

use hearth_api::auth::GoogleTokenVerifier;
use hearth_api::files::DiskFileStore;
use hearth_api::mail::HttpMailer;
use hearth_api::state::AppState;
use hearth_api::store::PgStore;
use hearth_api::create_router;
use hearth_core::config::AppConfig;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_api=debug,tower_http=debug".into()),
        )
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Connect persistence and run migrations
    let store = Arc::new(PgStore::connect(&config.database).await?);
    sqlx::migrate!("./migrations").run(store.pool()).await?;

    // External collaborators
    let mailer = Arc::new(HttpMailer::from_config(&config.mail)?);
    let verifier = Arc::new(GoogleTokenVerifier::new(
        config.auth.google_client_id.clone(),
    ));
    let files = Arc::new(DiskFileStore::new(&config.files.photo_dir));

    // Create application state
    let state = Arc::new(AppState::new(
        config,
        store.clone(),
        store,
        mailer,
        verifier,
        files,
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Hearth API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
