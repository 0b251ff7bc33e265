//! relay-gateway server entry point.
//!
//! Starts the Axum HTTP server with push, streaming, and WebSocket
//! endpoints, and closes every live connection on shutdown.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use relay_gateway::api;
use relay_gateway::app_state::AppState;
use relay_gateway::config::GatewayConfig;
use relay_gateway::domain::{
    ConnectionRegistry, CorrelationTable, PublicAccountSet, RequestResponseBridge,
};
use relay_gateway::service::RelayService;
use relay_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = Arc::new(GatewayConfig::from_env()?);
    tracing::info!(addr = %config.listen_addr, "starting relay-gateway");

    // Build domain layer
    let registry = Arc::new(ConnectionRegistry::new());
    let correlations = Arc::new(CorrelationTable::new(config.correlation_ttl));
    let bridge = Arc::new(RequestResponseBridge::new());
    let accounts = Arc::new(PublicAccountSet::with_accounts(
        config.public_accounts.iter().cloned(),
    ));

    // Build service layer
    let relay = Arc::new(RelayService::new(
        registry,
        correlations,
        bridge,
        accounts,
    ));

    // Build application state
    let app_state = AppState {
        relay: Arc::clone(&relay),
        config: Arc::clone(&config),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router(config.request_timeout))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors_origins))
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close every live connection before the process exits.
    relay.registry().shutdown().await;
    tracing::info!("relay-gateway stopped");

    Ok(())
}

/// Builds the CORS layer from the configured origin list.
fn cors_layer(origins: &str) -> CorsLayer {
    if origins.trim() == "*" {
        return CorsLayer::permissive();
    }
    let parsed: Vec<HeaderValue> = origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Resolves when the process receives a termination signal.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
