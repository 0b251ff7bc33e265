//! Message model: inbound pushes, wire assembly, and outbound frames.
//!
//! An [`InboundMessage`] is a validated upstream push. Before delivery it is
//! turned into a wire message: the payload object augmented with the resolved
//! target, the correlation identifier, the original-sender block, and any
//! event metadata the upstream supplied.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use super::Identity;
use crate::error::GatewayError;

/// A validated upstream push message addressed to one identity.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Declared sender identity (delivery target before mention resolution).
    pub identity: Identity,
    /// Arbitrary structured payload. Must be a JSON object.
    pub data: Value,
    /// Optional event type supplied by the upstream system.
    pub event_type: Option<String>,
    /// Optional event identifier supplied by the upstream system.
    pub event_id: Option<String>,
    /// Optional upstream timestamp.
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Checks the structural invariants of the message.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidMessage`] if the identity is empty or
    /// the payload is not a JSON object.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.identity.is_empty() {
            return Err(GatewayError::InvalidMessage(
                "missing user_id".to_string(),
            ));
        }
        if !self.data.is_object() {
            return Err(GatewayError::InvalidMessage(
                "data must be a JSON object".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the correlation identifier embedded in the payload, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.data.get("correlation_id").and_then(Value::as_str)
    }

    /// Writes `correlation_id` into the payload so the pipeline (and the
    /// receiving client) observe the same identifier the caller registered.
    pub fn set_correlation_id(&mut self, correlation_id: &str) {
        if let Some(obj) = self.data.as_object_mut() {
            obj.insert("correlation_id".to_string(), json!(correlation_id));
        }
    }

    /// Assembles the wire message delivered to the target's connection.
    ///
    /// The payload object is cloned and augmented with `user_id` (the
    /// resolved target), `correlation_id`, the `original_sender` block, and
    /// `event_type`/`event_id` when present. The payload itself wins no
    /// conflict: augmented fields overwrite same-named payload fields.
    #[must_use]
    pub fn to_wire(
        &self,
        target: &Identity,
        original_sender: &OriginalSender,
        correlation_id: &str,
    ) -> Value {
        let mut wire = self.data.clone();
        if let Some(obj) = wire.as_object_mut() {
            obj.insert("user_id".to_string(), json!(target));
            obj.insert("correlation_id".to_string(), json!(correlation_id));
            obj.insert(
                "original_sender".to_string(),
                serde_json::to_value(original_sender).unwrap_or_default(),
            );
            if let Some(event_type) = &self.event_type {
                obj.insert("event_type".to_string(), json!(event_type));
            }
            if let Some(event_id) = &self.event_id {
                obj.insert("event_id".to_string(), json!(event_id));
            }
        }
        wire
    }
}

/// Provenance block attached to every delivered message.
///
/// Present whether or not mention redirection occurred, so the receiving
/// side can always tell who originated a message.
#[derive(Debug, Clone, Serialize)]
pub struct OriginalSender {
    /// Identity that originated the message.
    #[serde(rename = "user_id")]
    pub identity: Identity,
    /// Upstream timestamp of the original message, if supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of running one message through the delivery pipeline.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    /// Identity the message was actually delivered to (post mention
    /// resolution).
    pub target: Identity,
    /// Correlation identifier recorded for the message.
    pub correlation_id: String,
    /// Whether the target had a live connection that accepted the send.
    pub delivered: bool,
}

/// Frame passed by value to a connection's writer task.
///
/// The registry never holds a connection reference across a send; it hands
/// frames to the per-connection channel and the transport side does the I/O.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    /// A JSON message to serialize and send to the client.
    Message(Value),
    /// Instruct the writer to close the connection.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Human-readable close reason.
        reason: String,
    },
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn msg(identity: &str, data: Value) -> InboundMessage {
        InboundMessage {
            identity: Identity::from(identity),
            data,
            event_type: None,
            event_id: None,
            timestamp: None,
        }
    }

    #[test]
    fn validate_accepts_object_payload() {
        let m = msg("user1", json!({"message": "hi"}));
        assert!(m.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_identity() {
        let m = msg("", json!({"message": "hi"}));
        assert!(m.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_object_payload() {
        let m = msg("user1", json!("just a string"));
        assert!(m.validate().is_err());
    }

    #[test]
    fn correlation_id_read_from_payload() {
        let m = msg("user1", json!({"correlation_id": "corr_1"}));
        assert_eq!(m.correlation_id(), Some("corr_1"));
        let m = msg("user1", json!({}));
        assert_eq!(m.correlation_id(), None);
    }

    #[test]
    fn wire_message_carries_provenance() {
        let m = msg("user123", json!({"message": "hello", "action": "test"}));
        let sender = OriginalSender {
            identity: Identity::from("user123"),
            timestamp: None,
        };
        let wire = m.to_wire(&Identity::from("ci_bot"), &sender, "corr_9");

        assert_eq!(wire.get("user_id"), Some(&json!("ci_bot")));
        assert_eq!(wire.get("correlation_id"), Some(&json!("corr_9")));
        assert_eq!(wire.get("message"), Some(&json!("hello")));
        assert_eq!(wire.get("action"), Some(&json!("test")));

        let Some(original) = wire.get("original_sender") else {
            panic!("original_sender missing");
        };
        assert_eq!(original.get("user_id"), Some(&json!("user123")));
    }

    #[test]
    fn wire_message_includes_event_metadata_when_present() {
        let mut m = msg("user1", json!({"message": "hi"}));
        m.event_type = Some("notification".to_string());
        m.event_id = Some("evt_1".to_string());
        let sender = OriginalSender {
            identity: Identity::from("user1"),
            timestamp: None,
        };
        let wire = m.to_wire(&Identity::from("user1"), &sender, "c1");
        assert_eq!(wire.get("event_type"), Some(&json!("notification")));
        assert_eq!(wire.get("event_id"), Some(&json!("evt_1")));
    }
}
