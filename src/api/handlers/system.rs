//! System endpoints: health check and metrics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"healthy"` while the process serves requests.
    status: String,
    /// Number of live duplex connections.
    connections: usize,
    /// Crate version.
    version: String,
    /// Current server time.
    timestamp: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health, live connection count, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.relay.stats().await;
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            connections: stats.active_connections,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now().to_rfc3339(),
        }),
    )
}

/// Metrics response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MetricsResponse {
    /// Service name for scrape labeling.
    service: &'static str,
    /// Number of live duplex connections.
    active_connections: usize,
    /// In-flight request/response registrations.
    pending_requests: usize,
    /// Entries currently held by the correlation table.
    correlation_entries: usize,
}

/// `GET /metrics` — In-memory state counters.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "System",
    summary = "Service metrics",
    description = "Returns counters for live connections, pending request/response flows, and correlation entries.",
    responses(
        (status = 200, description = "Current counters", body = MetricsResponse),
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.relay.stats().await;
    (
        StatusCode::OK,
        Json(MetricsResponse {
            service: "relay-gateway",
            active_connections: stats.active_connections,
            pending_requests: stats.pending_requests,
            correlation_entries: stats.correlation_entries,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}
