//! Streaming request/response endpoint.
//!
//! `POST /sse/send` forwards an upstream message to the target's duplex
//! connection and streams the replies back to the caller as server-sent
//! events. The flow registers a correlation identifier on the
//! [`RequestResponseBridge`](crate::domain::RequestResponseBridge) before
//! delivery so no reply can slip through, reads with a bounded per-reply
//! timeout, and always unregisters exactly once on the way out.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures_util::{Stream, stream};
use serde_json::json;
use tokio::sync::mpsc;

use crate::api::dto::PushRequest;
use crate::app_state::AppState;
use crate::domain::{InboundMessage, ReplyFrame};
use crate::error::{ErrorResponse, GatewayError};
use crate::service::RelayService;

/// `POST /sse/send` — Push a message and stream the duplex replies back.
///
/// Delivery failure and reply timeout are reported as terminal error
/// events on the stream (carrying the correlation id), not HTTP errors.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidMessage`] for a malformed body and
/// [`GatewayError::CorrelationInUse`] when the supplied correlation id
/// already has an open flow.
#[utoipa::path(
    post,
    path = "/sse/send",
    tag = "Push",
    summary = "Push a message and stream replies",
    description = "Delivers a message to the target's live connection, then streams each reply matching the correlation id as a server-sent event until a final reply, timeout, or client disconnect.",
    request_body = PushRequest,
    responses(
        (status = 200, description = "SSE stream of replies", content_type = "text/event-stream"),
        (status = 400, description = "Malformed message", body = ErrorResponse),
        (status = 409, description = "Correlation id already registered", body = ErrorResponse),
    )
)]
pub async fn send_with_response(
    State(state): State<AppState>,
    Json(req): Json<PushRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let mut message = req.into_message();
    message.validate()?;

    let correlation_id = message
        .correlation_id()
        .map(ToString::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    message.set_correlation_id(&correlation_id);

    // Register before delivery so an immediate reply cannot be missed.
    let reply_rx = state.relay.bridge().register(correlation_id.clone()).await?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let relay = Arc::clone(&state.relay);
    let read_timeout = state.config.response_timeout;
    tokio::spawn(async move {
        pump_replies(
            relay,
            message,
            correlation_id,
            reply_rx,
            event_tx,
            read_timeout,
        )
        .await;
    });

    let event_stream = stream::unfold(event_rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|data| (Ok(Event::default().data(data)), rx))
    });
    Ok(Sse::new(event_stream).keep_alive(KeepAlive::default()))
}

/// Drives one streaming flow: deliver the message, then relay each
/// bridge reply to the SSE channel until a terminal condition.
///
/// Terminal conditions: a reply marked `is_final`, the unregistration
/// sentinel, a read timeout, or the SSE client going away (observed as a
/// failed event send). Whatever the exit path, the registration and the
/// correlation entry are cleaned up here, exactly once.
async fn pump_replies(
    relay: Arc<RelayService>,
    message: InboundMessage,
    correlation_id: String,
    mut reply_rx: mpsc::UnboundedReceiver<ReplyFrame>,
    events: mpsc::UnboundedSender<String>,
    read_timeout: Duration,
) {
    match relay.process_message(&message).await {
        Ok(receipt) if receipt.delivered => loop {
            match tokio::time::timeout(read_timeout, reply_rx.recv()).await {
                Ok(Some(ReplyFrame::Payload(wire))) => {
                    let last = is_final(&wire);
                    if events.send(wire).is_err() {
                        // SSE client went away; stop reading.
                        break;
                    }
                    if last {
                        break;
                    }
                }
                Ok(Some(ReplyFrame::Closed)) | Ok(None) => break,
                Err(_) => {
                    tracing::debug!(%correlation_id, "timed out waiting for duplex reply");
                    let _ =
                        events.send(error_event("Timeout waiting for response", &correlation_id));
                    break;
                }
            }
        },
        Ok(_) => {
            let _ = events.send(error_event("User not connected", &correlation_id));
        }
        Err(err) => {
            let _ = events.send(error_event(&err.to_string(), &correlation_id));
        }
    }

    relay.bridge().unregister(&correlation_id).await;
    relay.correlations().remove(&correlation_id).await;
}

fn is_final(wire: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(wire)
        .ok()
        .and_then(|v| v.get("is_final").and_then(serde_json::Value::as_bool))
        .unwrap_or(false)
}

fn error_event(error: &str, correlation_id: &str) -> String {
    json!({"error": error, "correlation_id": correlation_id}).to_string()
}

/// Streaming route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/sse/send", post(send_with_response))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        ConnectionHandle, ConnectionRegistry, CorrelationTable, Identity, OutboundFrame,
        PublicAccountSet, RequestResponseBridge,
    };
    use serde_json::json;
    use tokio_test::assert_ok;

    fn make_relay() -> Arc<RelayService> {
        Arc::new(RelayService::new(
            Arc::new(ConnectionRegistry::new()),
            Arc::new(CorrelationTable::default()),
            Arc::new(RequestResponseBridge::new()),
            Arc::new(PublicAccountSet::new()),
        ))
    }

    async fn connect(
        relay: &RelayService,
        identity: &str,
    ) -> tokio::sync::mpsc::UnboundedReceiver<OutboundFrame> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        assert_ok!(
            relay
                .registry()
                .connect(Identity::from(identity), ConnectionHandle::new(tx))
                .await
        );
        rx
    }

    fn msg(identity: &str, correlation_id: &str) -> InboundMessage {
        InboundMessage {
            identity: Identity::from(identity),
            data: json!({"message": "ping", "correlation_id": correlation_id}),
            event_type: None,
            event_id: None,
            timestamp: None,
        }
    }

    #[tokio::test]
    async fn replies_stream_until_final() {
        let relay = make_relay();
        let _ws_rx = connect(&relay, "user1").await;
        let reply_rx = assert_ok!(relay.bridge().register("corr_1").await);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(pump_replies(
            Arc::clone(&relay),
            msg("user1", "corr_1"),
            "corr_1".to_string(),
            reply_rx,
            event_tx,
            Duration::from_secs(30),
        ));

        assert!(
            relay
                .forward_reply(
                    &Identity::from("user1"),
                    &json!({"correlation_id": "corr_1", "step": 1}),
                )
                .await
        );
        assert!(
            relay
                .forward_reply(
                    &Identity::from("user1"),
                    &json!({"correlation_id": "corr_1", "step": 2, "is_final": true}),
                )
                .await
        );

        let Some(first) = event_rx.recv().await else {
            panic!("expected first reply event");
        };
        assert!(first.contains("\"step\":1"));
        let Some(second) = event_rx.recv().await else {
            panic!("expected final reply event");
        };
        assert!(second.contains("is_final"));

        assert_ok!(pump.await);
        assert_eq!(relay.bridge().pending_count().await, 0);
        assert_eq!(relay.correlations().lookup("corr_1").await, None);
    }

    #[tokio::test]
    async fn undeliverable_message_emits_error_event() {
        let relay = make_relay();
        let reply_rx = assert_ok!(relay.bridge().register("corr_1").await);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(pump_replies(
            Arc::clone(&relay),
            msg("nobody", "corr_1"),
            "corr_1".to_string(),
            reply_rx,
            event_tx,
            Duration::from_secs(30),
        ));

        let Some(event) = event_rx.recv().await else {
            panic!("expected error event");
        };
        assert!(event.contains("User not connected"));
        assert!(event.contains("corr_1"));

        assert_ok!(pump.await);
        assert_eq!(relay.bridge().pending_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out() {
        let relay = make_relay();
        let _ws_rx = connect(&relay, "user1").await;
        let reply_rx = assert_ok!(relay.bridge().register("corr_1").await);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let pump = tokio::spawn(pump_replies(
            Arc::clone(&relay),
            msg("user1", "corr_1"),
            "corr_1".to_string(),
            reply_rx,
            event_tx,
            Duration::from_secs(30),
        ));

        // No reply ever arrives; the paused clock advances past the
        // deadline as soon as the runtime is idle.
        let Some(event) = event_rx.recv().await else {
            panic!("expected timeout event");
        };
        assert!(event.contains("Timeout waiting for response"));

        assert_ok!(pump.await);
        assert_eq!(relay.bridge().pending_count().await, 0);
    }

    #[tokio::test]
    async fn client_disconnect_stops_the_flow() {
        let relay = make_relay();
        let _ws_rx = connect(&relay, "user1").await;
        let reply_rx = assert_ok!(relay.bridge().register("corr_1").await);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        drop(event_rx); // SSE consumer gone before any reply

        let pump = tokio::spawn(pump_replies(
            Arc::clone(&relay),
            msg("user1", "corr_1"),
            "corr_1".to_string(),
            reply_rx,
            event_tx,
            Duration::from_secs(30),
        ));

        assert!(
            relay
                .forward_reply(
                    &Identity::from("user1"),
                    &json!({"correlation_id": "corr_1", "step": 1}),
                )
                .await
        );

        assert_ok!(pump.await);
        assert_eq!(relay.bridge().pending_count().await, 0);
    }

    #[test]
    fn is_final_reads_top_level_flag() {
        assert!(is_final("{\"is_final\":true}"));
        assert!(!is_final("{\"is_final\":false}"));
        assert!(!is_final("{\"done\":true}"));
        assert!(!is_final("not json"));
    }
}
