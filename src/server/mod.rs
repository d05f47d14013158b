use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Extension, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::providers::ProviderClients;

pub mod error;
pub mod handlers;

/// Shared, read-only state; every request builds its own provider chain from it
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub clients: ProviderClients,
}

impl AppState {
    pub fn new(config: Config) -> crate::Result<Self> {
        let clients = ProviderClients::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            clients,
        })
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/api/transcript", post(handlers::transcript))
        .route("/api/list-transcripts", post(handlers::list_transcripts))
        .route("/api/scrape-website", post(handlers::scrape_website))
        .route("/api/config", get(handlers::get_config))
        .route("/health", get(handlers::health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: Config) -> crate::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;

    let state = AppState::new(config)?;
    tracing::info!(
        providers = ?state.config.providers.order,
        direct_enabled = state.config.providers.direct_enabled,
        "Transcript providers configured"
    );

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
