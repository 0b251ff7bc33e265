//! Upstream push DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::{Identity, InboundMessage};
use crate::service::BatchItemResult;

/// Request body for `POST /sse/push`, `POST /sse/push/batch` (as an array
/// element), and `POST /sse/send`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PushRequest {
    /// Target user identity.
    pub user_id: String,
    /// Message data payload. Must be a JSON object; may carry a
    /// `correlation_id` for request/response matching.
    #[schema(value_type = Object)]
    pub data: Value,
    /// Optional event type.
    #[serde(default)]
    pub event_type: Option<String>,
    /// Optional event identifier.
    #[serde(default)]
    pub event_id: Option<String>,
    /// Optional upstream timestamp.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl PushRequest {
    /// Converts the DTO into the domain message model.
    #[must_use]
    pub fn into_message(self) -> InboundMessage {
        InboundMessage {
            identity: Identity::from(self.user_id),
            data: self.data,
            event_type: self.event_type,
            event_id: self.event_id,
            timestamp: self.timestamp,
        }
    }
}

/// Response body for `POST /sse/push`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PushResponse {
    /// `"success"` when delivered, `"partial"` when the target had no live
    /// connection.
    pub status: String,
    /// Human-readable delivery summary.
    pub message: String,
}

impl PushResponse {
    /// Builds the response for a delivery outcome.
    #[must_use]
    pub fn from_delivered(delivered: bool) -> Self {
        if delivered {
            Self {
                status: "success".to_string(),
                message: "Message delivered".to_string(),
            }
        } else {
            Self {
                status: "partial".to_string(),
                message: "User not connected".to_string(),
            }
        }
    }
}

/// Response body for `POST /sse/push/batch`.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchResponse {
    /// Per-message outcomes in original input order.
    pub results: Vec<BatchItemDto>,
}

/// One batch item outcome.
#[derive(Debug, Serialize, ToSchema)]
pub struct BatchItemDto {
    /// Position of the message in the input sequence.
    pub index: usize,
    /// Declared target identity.
    pub user_id: String,
    /// Whether delivery succeeded.
    pub success: bool,
    /// Failure description, present only when the item's pipeline errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BatchItemResult> for BatchItemDto {
    fn from(item: BatchItemResult) -> Self {
        Self {
            index: item.index,
            user_id: item.identity.into(),
            success: item.success,
            error: item.error,
        }
    }
}
