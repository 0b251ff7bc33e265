//! Live connection registry with short-held locks around membership.
//!
//! [`ConnectionRegistry`] is the exclusive owner of connection state: it
//! maps each [`Identity`] to at most one [`ConnectionHandle`]. Membership
//! mutations happen under a briefly-held write lock; the actual send goes
//! through a cloned handle outside any lock, so one slow or dead connection
//! never blocks registration of new ones.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};

use super::Identity;
use super::message::OutboundFrame;
use crate::error::GatewayError;

/// WebSocket close code sent on registry-wide shutdown ("going away").
const CLOSE_GOING_AWAY: u16 = 1001;

/// Send-capable handle to one live connection.
///
/// Wraps the sending half of the per-connection frame channel plus a unique
/// connection identifier. The identifier guards removal: a failed send only
/// evicts the exact connection that failed, never a replacement that raced
/// in afterwards.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    connection_id: uuid::Uuid,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl ConnectionHandle {
    /// Creates a handle around the sending half of a connection's frame
    /// channel.
    #[must_use]
    pub fn new(sender: mpsc::UnboundedSender<OutboundFrame>) -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4(),
            sender,
        }
    }

    /// Returns the unique identifier of this connection instance.
    #[must_use]
    pub fn connection_id(&self) -> uuid::Uuid {
        self.connection_id
    }

    /// Hands a frame to the connection's writer task.
    ///
    /// Fails only when the writer task is gone, i.e. the connection is dead.
    fn send(&self, frame: OutboundFrame) -> bool {
        self.sender.send(frame).is_ok()
    }
}

/// Central store of live connections, at most one per identity.
///
/// # Concurrency
///
/// - `connect` is an atomic check-and-insert under the write lock.
/// - `send_to`/`broadcast` copy handles under the read lock and perform the
///   send after releasing it.
/// - Removal after a failed send is guarded by connection-id equality.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Identity, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live connection for `identity`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::DuplicateIdentity`] if a live connection
    /// already exists for the identity. The existing connection is kept.
    pub async fn connect(
        &self,
        identity: Identity,
        handle: ConnectionHandle,
    ) -> Result<(), GatewayError> {
        let mut map = self.connections.write().await;
        if map.contains_key(&identity) {
            return Err(GatewayError::DuplicateIdentity(identity));
        }
        tracing::info!(%identity, connection_id = %handle.connection_id, "connection registered");
        map.insert(identity, handle);
        Ok(())
    }

    /// Removes the connection for `identity`, whichever instance it is.
    ///
    /// Idempotent: removing an absent identity is a no-op.
    pub async fn disconnect(&self, identity: &Identity) {
        let mut map = self.connections.write().await;
        if map.remove(identity).is_some() {
            tracing::info!(%identity, "connection removed");
        } else {
            tracing::debug!(%identity, "disconnect for identity with no live connection");
        }
    }

    /// Removes the connection for `identity` only if it is still the given
    /// instance. Returns `true` if a removal happened.
    ///
    /// Used on send failure and connection teardown so a connection that was
    /// legitimately replaced during the race window is never evicted.
    pub async fn remove_if(&self, identity: &Identity, connection_id: uuid::Uuid) -> bool {
        let mut map = self.connections.write().await;
        if map
            .get(identity)
            .is_some_and(|h| h.connection_id == connection_id)
        {
            map.remove(identity);
            tracing::info!(%identity, %connection_id, "connection removed");
            return true;
        }
        false
    }

    /// Sends a payload to the identity's live connection.
    ///
    /// Returns `false` if no connection exists or the send fails. A failed
    /// send marks the connection presumed dead and removes it (guarded by
    /// connection id).
    pub async fn send_to(&self, identity: &Identity, payload: Value) -> bool {
        let handle = {
            let map = self.connections.read().await;
            map.get(identity).cloned()
        };
        let Some(handle) = handle else {
            return false;
        };
        if handle.send(OutboundFrame::Message(payload)) {
            return true;
        }
        tracing::warn!(%identity, "send failed, removing presumed-dead connection");
        self.remove_if(identity, handle.connection_id).await;
        false
    }

    /// Attempts delivery to every currently registered identity.
    ///
    /// A snapshot of the mapping is taken once; sends happen outside the
    /// lock and failing identities are removed afterwards. Returns the
    /// number of successful deliveries.
    pub async fn broadcast(&self, payload: &Value) -> usize {
        let snapshot = self.connections.read().await.clone();

        let mut sent: usize = 0;
        let mut dead = Vec::new();
        for (identity, handle) in snapshot {
            if handle.send(OutboundFrame::Message(payload.clone())) {
                sent = sent.saturating_add(1);
            } else {
                dead.push((identity, handle.connection_id));
            }
        }

        for (identity, connection_id) in dead {
            tracing::warn!(%identity, "broadcast send failed, removing connection");
            self.remove_if(&identity, connection_id).await;
        }
        sent
    }

    /// Returns the current number of live connections.
    pub async fn count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Closes every live connection and empties the registry.
    ///
    /// Individual close failures are tolerated and do not abort the sweep.
    pub async fn shutdown(&self) {
        let drained = {
            let mut map = self.connections.write().await;
            std::mem::take(&mut *map)
        };
        let total = drained.len();
        for (identity, handle) in drained {
            if !handle.send(OutboundFrame::Close {
                code: CLOSE_GOING_AWAY,
                reason: "server shutdown".to_string(),
            }) {
                tracing::debug!(%identity, "connection already gone at shutdown");
            }
        }
        tracing::info!(connections = total, "registry shut down");
    }
}
