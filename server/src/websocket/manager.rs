//! WebSocket connection manager.
//!
//! Tracks active WebSocket connections and fans realtime messages out to
//! them.

use std::sync::Arc;

use dashmap::DashMap;
use schoolhub_realtime::RealtimeMessage;
use tokio::sync::mpsc;

/// Sender for WebSocket messages.
pub type MessageSender = mpsc::UnboundedSender<RealtimeMessage>;

/// Manages active WebSocket connections.
///
/// Thread-safe and can be shared across handlers via `Arc`.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Outbound channel per connection, keyed by connection ID.
    connections: DashMap<String, MessageSender>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection.
    ///
    /// Returns the connection ID.
    pub fn register(&self, sender: MessageSender) -> String {
        let conn_id = uuid::Uuid::new_v4().to_string();
        self.connections.insert(conn_id.clone(), sender);

        tracing::info!(conn_id = %conn_id, "WebSocket connection registered");

        conn_id
    }

    /// Unregister a connection.
    pub fn unregister(&self, conn_id: &str) {
        if self.connections.remove(conn_id).is_some() {
            tracing::info!(conn_id = %conn_id, "WebSocket connection unregistered");
        }
    }

    /// Broadcast a message to all connections except the sender.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_except(&self, sender_conn_id: &str, message: &RealtimeMessage) -> usize {
        let sent_count = self
            .connections
            .iter()
            .filter(|entry| entry.key() != sender_conn_id)
            .filter(|entry| entry.value().send(message.clone()).is_ok())
            .count();

        tracing::debug!(
            sender = %sender_conn_id,
            kind = %message.kind,
            recipients = sent_count,
            "Relayed message to connections"
        );

        sent_count
    }

    /// Broadcast a message to all connections.
    ///
    /// Returns the number of connections that received the message.
    pub fn broadcast_all(&self, message: &RealtimeMessage) -> usize {
        let sent_count = self
            .connections
            .iter()
            .filter(|entry| entry.value().send(message.clone()).is_ok())
            .count();

        tracing::debug!(
            kind = %message.kind,
            recipients = sent_count,
            "Broadcast message to connections"
        );

        sent_count
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, conn_id: &str, message: RealtimeMessage) -> bool {
        self.connections
            .get(conn_id)
            .is_some_and(|sender| sender.send(message).is_ok())
    }

    /// Get the number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_realtime::EventKind;
    use serde_json::json;

    fn chat() -> RealtimeMessage {
        RealtimeMessage::new(EventKind::Chat, json!({"msg": "hi"}), 0)
    }

    #[test]
    fn test_register_unregister() {
        let manager = ConnectionManager::new();
        let (tx, _rx) = mpsc::unbounded_channel();

        let conn_id = manager.register(tx);
        assert_eq!(manager.connection_count(), 1);

        manager.unregister(&conn_id);
        assert_eq!(manager.connection_count(), 0);

        // Unknown ids are ignored
        manager.unregister(&conn_id);
    }

    #[test]
    fn test_broadcast_except() {
        let manager = ConnectionManager::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();

        let conn1 = manager.register(tx1);
        let _conn2 = manager.register(tx2);

        let sent = manager.broadcast_except(&conn1, &chat());
        assert_eq!(sent, 1);

        assert!(rx1.try_recv().is_err());

        let msg = rx2.try_recv().unwrap();
        assert_eq!(msg.kind, EventKind::Chat);
    }

    #[test]
    fn test_broadcast_all_skips_closed_connections() {
        let manager = ConnectionManager::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, rx2) = mpsc::unbounded_channel();
        manager.register(tx1);
        manager.register(tx2);
        drop(rx2);

        assert_eq!(manager.broadcast_all(&chat()), 1);
        assert!(rx1.try_recv().is_ok());
    }

    #[test]
    fn test_send_to() {
        let manager = ConnectionManager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let conn_id = manager.register(tx);

        assert!(manager.send_to(&conn_id, RealtimeMessage::heartbeat(1)));
        assert!(rx.try_recv().unwrap().is_heartbeat());
        assert!(!manager.send_to("missing", RealtimeMessage::heartbeat(1)));
    }
}
