//! Fire-and-forget push endpoints: single message and batch.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{BatchItemDto, BatchResponse, PushRequest, PushResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, GatewayError};

/// `POST /sse/push` — Deliver a single upstream message.
///
/// Delivery to an absent identity is not an HTTP error: the response
/// reports `"partial"` and the message is dropped.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidMessage`] when the body fails
/// structural validation.
#[utoipa::path(
    post,
    path = "/sse/push",
    tag = "Push",
    summary = "Push one message",
    description = "Receives a single upstream message and delivers it to the target's live connection.",
    request_body = PushRequest,
    responses(
        (status = 200, description = "Delivery attempted", body = PushResponse),
        (status = 400, description = "Malformed message", body = ErrorResponse),
    )
)]
pub async fn push_message(
    State(state): State<AppState>,
    Json(req): Json<PushRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let message = req.into_message();
    let receipt = state.relay.process_message(&message).await?;
    Ok(Json(PushResponse::from_delivered(receipt.delivered)))
}

/// `POST /sse/push/batch` — Deliver an ordered batch of messages.
///
/// Items are dispatched concurrently; per-item failures are reported in
/// the results and never abort sibling deliveries.
#[utoipa::path(
    post,
    path = "/sse/push/batch",
    tag = "Push",
    summary = "Push a batch of messages",
    description = "Receives multiple upstream messages, dispatches them concurrently, and returns per-item outcomes in input order.",
    request_body = Vec<PushRequest>,
    responses(
        (status = 200, description = "Batch dispatched", body = BatchResponse),
    )
)]
pub async fn push_batch(
    State(state): State<AppState>,
    Json(reqs): Json<Vec<PushRequest>>,
) -> impl IntoResponse {
    let messages = reqs.into_iter().map(PushRequest::into_message).collect();
    let results = state.relay.process_batch(messages).await;
    Json(BatchResponse {
        results: results.into_iter().map(BatchItemDto::from).collect(),
    })
}

/// Push routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sse/push", post(push_message))
        .route("/sse/push/batch", post(push_batch))
}
