//! Relay service: the single-message pipeline and batch dispatcher.

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{
    ConnectionRegistry, CorrelationTable, DeliveryReceipt, Identity, InboundMessage,
    MentionRouter, PublicAccountSet, RequestResponseBridge,
};
use crate::error::GatewayError;

/// Orchestration layer for message delivery.
///
/// Stateless coordinator: owns shared references to the connection
/// registry, correlation table, response bridge, and public account set.
/// Every inbound message follows the pipeline: validate → resolve mention
/// target → record correlation → send to the target's live connection.
#[derive(Debug, Clone)]
pub struct RelayService {
    registry: Arc<ConnectionRegistry>,
    correlations: Arc<CorrelationTable>,
    bridge: Arc<RequestResponseBridge>,
    accounts: Arc<PublicAccountSet>,
    router: MentionRouter,
}

/// Per-item outcome of a batch dispatch, in original input order.
#[derive(Debug, Clone)]
pub struct BatchItemResult {
    /// Position of the message in the input sequence.
    pub index: usize,
    /// Declared target identity of the message.
    pub identity: Identity,
    /// Whether delivery succeeded.
    pub success: bool,
    /// Failure description when the item's pipeline errored.
    pub error: Option<String>,
}

/// Observability snapshot of the relay's in-memory state.
#[derive(Debug, Clone, Copy)]
pub struct RelayStats {
    /// Live connections in the registry.
    pub active_connections: usize,
    /// In-flight request/response registrations.
    pub pending_requests: usize,
    /// Entries currently held by the correlation table.
    pub correlation_entries: usize,
}

impl RelayService {
    /// Creates a new `RelayService` over explicitly-owned collaborators.
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        correlations: Arc<CorrelationTable>,
        bridge: Arc<RequestResponseBridge>,
        accounts: Arc<PublicAccountSet>,
    ) -> Self {
        let router = MentionRouter::new(Arc::clone(&accounts));
        Self {
            registry,
            correlations,
            bridge,
            accounts,
            router,
        }
    }

    /// Returns a reference to the inner [`ConnectionRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`RequestResponseBridge`].
    #[must_use]
    pub fn bridge(&self) -> &Arc<RequestResponseBridge> {
        &self.bridge
    }

    /// Returns a reference to the inner [`CorrelationTable`].
    #[must_use]
    pub fn correlations(&self) -> &Arc<CorrelationTable> {
        &self.correlations
    }

    /// Returns a reference to the inner [`PublicAccountSet`].
    #[must_use]
    pub fn accounts(&self) -> &Arc<PublicAccountSet> {
        &self.accounts
    }

    /// Runs one message through the delivery pipeline.
    ///
    /// Generates a correlation identifier when the payload carries none,
    /// resolves the mention target, records the correlation, and attempts
    /// delivery. An absent or dead target is NOT an error: the receipt
    /// reports `delivered: false`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidMessage`] when the message fails
    /// structural validation.
    pub async fn process_message(
        &self,
        message: &InboundMessage,
    ) -> Result<DeliveryReceipt, GatewayError> {
        message.validate()?;

        let correlation_id = message
            .correlation_id()
            .map(ToString::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let resolved = self.router.resolve_target(message).await;
        self.correlations
            .store(correlation_id.clone(), resolved.target.clone())
            .await;

        let wire = message.to_wire(&resolved.target, &resolved.original_sender, &correlation_id);
        let delivered = self.registry.send_to(&resolved.target, wire).await;

        if delivered {
            tracing::debug!(target = %resolved.target, %correlation_id, "message delivered");
        } else {
            tracing::warn!(target = %resolved.target, "target not connected, message dropped");
        }

        Ok(DeliveryReceipt {
            target: resolved.target,
            correlation_id,
            delivered,
        })
    }

    /// Dispatches a batch of messages concurrently.
    ///
    /// Each message runs through the pipeline in its own task so a failure
    /// in one item — validation error, delivery failure, or panic — never
    /// aborts its siblings. Results are restored to input order.
    pub async fn process_batch(self: &Arc<Self>, messages: Vec<InboundMessage>) -> Vec<BatchItemResult> {
        let mut tasks = Vec::with_capacity(messages.len());
        for (index, message) in messages.into_iter().enumerate() {
            let service = Arc::clone(self);
            let identity = message.identity.clone();
            let task = tokio::spawn(async move { service.process_message(&message).await });
            tasks.push((index, identity, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (index, identity, task) in tasks {
            let item = match task.await {
                Ok(Ok(receipt)) => BatchItemResult {
                    index,
                    identity,
                    success: receipt.delivered,
                    error: None,
                },
                Ok(Err(err)) => BatchItemResult {
                    index,
                    identity,
                    success: false,
                    error: Some(err.to_string()),
                },
                Err(join_err) => {
                    tracing::error!(index, %identity, error = %join_err, "batch item task failed");
                    BatchItemResult {
                        index,
                        identity,
                        success: false,
                        error: Some("message task failed".to_string()),
                    }
                }
            };
            results.push(item);
        }

        // Completion order is unspecified; callers rely on input order.
        results.sort_by_key(|item| item.index);
        results
    }

    /// Forwards a duplex reply to whatever caller is waiting on its
    /// correlation identifier.
    ///
    /// A reply without a correlation identifier, or whose identifier has no
    /// pending registration, is benign and simply dropped.
    pub async fn forward_reply(&self, identity: &Identity, reply: &Value) -> bool {
        let Some(correlation_id) = reply.get("correlation_id").and_then(Value::as_str) else {
            tracing::debug!(%identity, "reply without correlation id, ignored");
            return false;
        };

        let delivered = self.bridge.deliver(correlation_id, reply).await;
        if delivered {
            if let Some(expected) = self.correlations.lookup(correlation_id).await
                && expected != *identity
            {
                tracing::warn!(
                    %identity,
                    %expected,
                    correlation_id,
                    "reply origin differs from recorded delivery target"
                );
            }
            tracing::debug!(%identity, correlation_id, "reply forwarded to pending request");
        }
        delivered
    }

    /// Returns a snapshot of connection and correlation counts.
    pub async fn stats(&self) -> RelayStats {
        RelayStats {
            active_connections: self.registry.count().await,
            pending_requests: self.bridge.pending_count().await,
            correlation_entries: self.correlations.len().await,
        }
    }
}
