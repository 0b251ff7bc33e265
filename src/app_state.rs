//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay service for message delivery and reply bridging.
    pub relay: Arc<RelayService>,
    /// Gateway configuration (timeouts, CORS, seeds).
    pub config: Arc<GatewayConfig>,
}
