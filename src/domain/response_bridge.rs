//! Bridge between asynchronous duplex replies and waiting response streams.
//!
//! A caller that wants a synchronous-looking request/response flow
//! registers a correlation identifier and receives the reading half of a
//! reply channel. Replies arriving later on any duplex connection are
//! matched by correlation identifier and pushed onto that channel in
//! arrival order. Unregistering pushes a sentinel first so a blocked
//! reader always wakes up.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::error::GatewayError;

/// Item delivered on a pending request's reply channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyFrame {
    /// A reply payload, serialized to the wire string.
    Payload(String),
    /// Sentinel: the flow was unregistered and no further replies follow.
    Closed,
}

/// Registry of in-flight request/response correlations.
///
/// Each key is effectively single-writer (the registrant); the bridge
/// itself guards insert and remove.
#[derive(Debug, Default)]
pub struct RequestResponseBridge {
    pending: Mutex<HashMap<String, mpsc::UnboundedSender<ReplyFrame>>>,
}

impl RequestResponseBridge {
    /// Creates an empty bridge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a pending request for `correlation_id` and returns the reply
    /// channel to read from.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::CorrelationInUse`] if a flow is already
    /// registered under this identifier. Reuse would corrupt routing, so it
    /// is a caller error rather than silently tolerated.
    pub async fn register(
        &self,
        correlation_id: impl Into<String>,
    ) -> Result<mpsc::UnboundedReceiver<ReplyFrame>, GatewayError> {
        let correlation_id = correlation_id.into();
        let mut pending = self.pending.lock().await;
        if pending.contains_key(&correlation_id) {
            return Err(GatewayError::CorrelationInUse(correlation_id));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        pending.insert(correlation_id, tx);
        Ok(rx)
    }

    /// Routes a reply to the pending request registered under
    /// `correlation_id`.
    ///
    /// Returns `false` when no registration exists — an expected outcome
    /// for duplex replies with no open synchronous flow (fire-and-forget
    /// replies, late replies after timeout) — or when the reader is gone.
    /// Multiple deliveries to one registration are forwarded in arrival
    /// order.
    pub async fn deliver(&self, correlation_id: &str, payload: &Value) -> bool {
        let sender = {
            let pending = self.pending.lock().await;
            pending.get(correlation_id).cloned()
        };
        let Some(sender) = sender else {
            tracing::debug!(correlation_id, "reply without pending request, dropped");
            return false;
        };
        let wire = serde_json::to_string(payload).unwrap_or_default();
        sender.send(ReplyFrame::Payload(wire)).is_ok()
    }

    /// Closes the pending request for `correlation_id`.
    ///
    /// Pushes the [`ReplyFrame::Closed`] sentinel (if still registered) so
    /// any blocked reader wakes up, then removes the registration.
    /// Idempotent.
    pub async fn unregister(&self, correlation_id: &str) {
        let removed = self.pending.lock().await.remove(correlation_id);
        if let Some(sender) = removed {
            // Reader may already be gone; the sentinel is simply dropped.
            let _ = sender.send(ReplyFrame::Closed);
        }
    }

    /// Returns the number of in-flight registrations.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}
