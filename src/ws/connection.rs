//! Per-connection WebSocket loop.
//!
//! Binds the socket to its identity in the registry, splits it into a
//! writer task (draining the registry's frame channel) and a read loop
//! (forwarding correlated client replies), and always performs a guarded
//! registry removal on the way out.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;

use super::messages::{CLOSE_POLICY_VIOLATION, ClientFrame};
use crate::domain::{ConnectionHandle, Identity, OutboundFrame};
use crate::service::RelayService;

/// Runs the lifecycle of a single WebSocket connection.
pub async fn run_connection(mut socket: WebSocket, identity: Identity, relay: Arc<RelayService>) {
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    let handle = ConnectionHandle::new(frame_tx);
    let connection_id = handle.connection_id();

    if let Err(err) = relay.registry().connect(identity.clone(), handle).await {
        tracing::warn!(%identity, %err, "rejecting connection");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_POLICY_VIOLATION,
                reason: "user already connected".into(),
            })))
            .await;
        return;
    }

    let (ws_tx, mut ws_rx) = socket.split();
    let writer = tokio::spawn(write_frames(ws_tx, frame_rx));

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => handle_client_frame(&relay, &identity, &text).await,
            Ok(Message::Close(_)) => break,
            // Ping/Pong are answered by axum.
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(%identity, error = %err, "ws read error");
                break;
            }
        }
    }

    // Guarded removal: only evict the connection this task registered.
    relay.registry().remove_if(&identity, connection_id).await;
    writer.abort();
    tracing::info!(%identity, "ws connection closed");
}

/// Drains the registry's frame channel into the socket.
///
/// Ends when the channel closes (connection removed from the registry) or
/// a close frame is written.
async fn write_frames(
    mut ws_tx: futures_util::stream::SplitSink<WebSocket, Message>,
    mut frame_rx: mpsc::UnboundedReceiver<OutboundFrame>,
) {
    while let Some(frame) = frame_rx.recv().await {
        match frame {
            OutboundFrame::Message(payload) => {
                let json = serde_json::to_string(&payload).unwrap_or_default();
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            OutboundFrame::Close { code, reason } => {
                let _ = ws_tx
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })))
                    .await;
                break;
            }
        }
    }
}

/// Routes one text frame from the client.
///
/// Frames with a correlation identifier are replies to a pending
/// request/response flow; anything else (heartbeats, malformed text) is
/// logged and dropped.
async fn handle_client_frame(relay: &RelayService, identity: &Identity, text: &str) {
    let Ok(value) = serde_json::from_str::<Value>(text) else {
        tracing::debug!(%identity, "ignoring malformed client frame");
        return;
    };
    match ClientFrame::from_value(&value) {
        Some(frame) if frame.correlation_id.is_some() => {
            let forwarded = relay.forward_reply(identity, &value).await;
            if !forwarded {
                tracing::debug!(
                    %identity,
                    frame_type = frame.frame_type.as_deref().unwrap_or("unknown"),
                    "reply had no pending request"
                );
            }
        }
        _ => {
            tracing::debug!(%identity, "client frame without correlation id");
        }
    }
}
