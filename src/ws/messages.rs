//! WebSocket wire types and close codes.

use serde::Deserialize;
use serde_json::Value;

/// Close code for a rejected duplicate connection (policy violation).
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Frame received from a connected client.
///
/// A typed view over the raw JSON: the raw value is what gets forwarded
/// to a pending request, this struct only drives the routing decision.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Message type discriminator (e.g. `"response"`, `"heartbeat"`).
    #[serde(rename = "type", default)]
    pub frame_type: Option<String>,
    /// Correlation identifier linking the frame to a pending request.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Frame payload.
    #[serde(default)]
    pub data: Value,
}

impl ClientFrame {
    /// Builds the typed view from an already-parsed JSON value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}
