use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Claims, TokenKind};
use crate::presence::{ConnectionId, PresenceRegistry};
use crate::security::TokenVerifier;

/// An authenticated, registered real-time connection.
#[derive(Debug)]
pub struct SocketSession {
    pub claims: Claims,
    pub connection_id: ConnectionId,
    /// Messages the transport pumps out to the socket.
    pub receiver: UnboundedReceiver<String>,
}

/// Real-time connection handshake.
///
/// Verifies the `Authorization` value from the connect metadata before any
/// application event is processed; a failed verification rejects the
/// connection. Holds the registry shared with chat delivery.
#[derive(Clone)]
pub struct SocketGateway {
    verifier: TokenVerifier,
    registry: PresenceRegistry,
}

impl SocketGateway {
    pub fn new(verifier: TokenVerifier, registry: PresenceRegistry) -> Self {
        Self { verifier, registry }
    }

    pub fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// Authenticate and register a new connection, announcing the user as
    /// online to all peers.
    pub async fn connect(&self, authorization: &str) -> Result<SocketSession> {
        let (claims, account) = self.verifier.decode(authorization, TokenKind::Access).await?;

        let (connection_id, receiver) = self.registry.register(account.id).await;
        self.registry.broadcast_presence(account.id, true).await;
        tracing::info!(user_id = %account.id, ?connection_id, "Socket connected");

        Ok(SocketSession {
            claims,
            connection_id,
            receiver,
        })
    }

    /// Drop a connection; the offline announcement goes out only when the
    /// user's last device left.
    pub async fn disconnect(&self, user_id: Uuid, connection_id: ConnectionId) {
        if self.registry.unregister(user_id, connection_id).await {
            self.registry.broadcast_presence(user_id, false).await;
            tracing::info!(%user_id, "Socket disconnected, user offline");
        }
    }
}
