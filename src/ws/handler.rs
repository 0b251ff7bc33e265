//! Axum WebSocket upgrade handler.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::domain::Identity;

/// Query parameters for the WebSocket endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Identity to bind the connection to.
    pub user_id: String,
}

/// `GET /ws?user_id=...` — Upgrade HTTP connection to WebSocket.
///
/// The duplicate-identity check happens after the upgrade, inside the
/// connection loop, so a rejected client receives a proper close frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let identity = Identity::from(query.user_id);
    let relay = std::sync::Arc::clone(&state.relay);

    ws.on_upgrade(move |socket| run_connection(socket, identity, relay))
}
