mod handlers;
mod types;

pub use handlers::AppState;
pub use types::*;

use crate::{
    Result,
    catalog::{Category, ModelCatalog},
    config::{Config, ServerConfig},
    llm::GeminiClient,
    staging::UploadStore,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

pub async fn run(config: Config) -> Result<()> {
    let catalog = Arc::new(ModelCatalog::from_overrides(&config.gemini.models));
    let gateway = GeminiClient::new(&config.gemini, catalog.clone())?;
    let uploads = UploadStore::new(&config.server.upload_dir)?;

    for category in Category::ALL {
        info!("{} requests use {}", category, catalog.model_for(category));
    }

    let app_state = AppState {
        gateway: Arc::new(gateway),
        uploads: Arc::new(uploads),
        catalog,
    };

    let app = create_router(app_state, &config.server);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            Category::Text.endpoint(),
            post(handlers::generate_text),
        )
        .route(
            Category::Image.endpoint(),
            post(handlers::generate_from_image),
        )
        .route(
            Category::Audio.endpoint(),
            post(handlers::generate_from_audio),
        )
        .route(
            Category::Document.endpoint(),
            post(handlers::generate_from_document),
        )
        .route("/models", get(handlers::list_models))
        .route("/chat", delete(handlers::clear_chat))
        .route("/health", get(handlers::health))
        .fallback_service(ServeDir::new(&server.public_dir))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
