use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod gateway;

pub use gateway::SocketGateway;

/// Unique identifier for one live real-time connection.
///
/// A user with several devices holds several connection ids; cleanup on
/// disconnect is keyed on the id, never on the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Event pushed to live connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresenceEvent {
    OnlineUser { user_id: Uuid },
    OfflineUser { user_id: Uuid },
    NewMessage { from: Uuid, payload: serde_json::Value },
}

struct Connection {
    id: ConnectionId,
    sender: UnboundedSender<String>,
}

/// In-memory index from account identity to its live connection handles.
///
/// Explicitly owned and passed by reference (`Clone` shares the inner map);
/// the transport layer and chat delivery both hold one. No persistence and
/// no I/O inside the lock.
#[derive(Default, Clone)]
pub struct PresenceRegistry {
    // user_id -> connections across all of that user's devices
    inner: Arc<RwLock<HashMap<Uuid, Vec<Connection>>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection for a user.
    ///
    /// Returns the connection id (used for cleanup) and the receiving half
    /// the transport pumps out to the socket.
    pub async fn register(&self, user_id: Uuid) -> (ConnectionId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let connection_id = ConnectionId::new();

        let mut guard = self.inner.write().await;
        guard.entry(user_id).or_default().push(Connection {
            id: connection_id,
            sender: tx,
        });

        tracing::debug!(
            %user_id,
            ?connection_id,
            devices = guard.get(&user_id).map(|v| v.len()).unwrap_or(0),
            "Connection registered"
        );

        (connection_id, rx)
    }

    /// Remove one connection. Returns `true` when it was the user's last one
    /// and the entry was pruned, which is the moment the user went offline.
    pub async fn unregister(&self, user_id: Uuid, connection_id: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;

        let Some(connections) = guard.get_mut(&user_id) else {
            return false;
        };
        connections.retain(|c| c.id != connection_id);

        if connections.is_empty() {
            guard.remove(&user_id);
            tracing::debug!(%user_id, "Last connection gone, user offline");
            true
        } else {
            false
        }
    }

    /// Connection ids currently registered for a user. Empty means offline.
    pub async fn connections_for(&self, user_id: Uuid) -> Vec<ConnectionId> {
        self.inner
            .read()
            .await
            .get(&user_id)
            .map(|connections| connections.iter().map(|c| c.id).collect())
            .unwrap_or_default()
    }

    /// Broadcast an online/offline transition to every connected peer.
    pub async fn broadcast_presence(&self, user_id: Uuid, online: bool) {
        let event = if online {
            PresenceEvent::OnlineUser { user_id }
        } else {
            PresenceEvent::OfflineUser { user_id }
        };
        self.broadcast_all(&event).await;
    }

    /// Deliver an event to every connection of one user, dropping dead
    /// senders along the way. Zero deliveries is a normal offline no-op.
    pub async fn send_to_user(&self, user_id: Uuid, event: &PresenceEvent) -> usize {
        let msg = match serde_json::to_string(event) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode presence event");
                return 0;
            }
        };

        let mut guard = self.inner.write().await;
        let Some(connections) = guard.get_mut(&user_id) else {
            return 0;
        };

        connections.retain(|c| c.sender.send(msg.clone()).is_ok());
        let delivered = connections.len();
        if connections.is_empty() {
            guard.remove(&user_id);
        }
        delivered
    }

    async fn broadcast_all(&self, event: &PresenceEvent) {
        let msg = match serde_json::to_string(event) {
            Ok(msg) => msg,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode presence event");
                return;
            }
        };

        let mut guard = self.inner.write().await;
        for connections in guard.values_mut() {
            connections.retain(|c| c.sender.send(msg.clone()).is_ok());
        }
        guard.retain(|_, connections| !connections.is_empty());
    }
}
