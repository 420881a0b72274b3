//! WebSocket handler for the realtime relay.
//!
//! Handles WebSocket connections: heartbeats are answered directly, any
//! other realtime message is relayed to every other connection.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use schoolhub_realtime::RealtimeMessage;
use tokio::sync::mpsc;

use crate::websocket::{now_ms, ConnectionManager};

/// Serve one upgraded socket until the client closes it.
///
/// Outbound messages reach the socket through the manager's channel, so
/// relays and `data_changed` announcements from other tasks never touch
/// the sink directly.
pub async fn handle_websocket_connection(socket: WebSocket, conn_manager: Arc<ConnectionManager>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<RealtimeMessage>();

    let conn_id = conn_manager.register(tx);

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client connected"
    );

    // Writer: manager channel -> socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg.encode() {
                Ok(text) => {
                    if let Err(e) = ws_sender.send(Message::Text(text.into())).await {
                        tracing::warn!("Failed to send WebSocket message: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!("Failed to serialize WebSocket message: {}", e);
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => {
                process_message(text.as_str(), &conn_manager, &conn_id);
            }
            Ok(Message::Binary(_)) => {
                tracing::warn!("Binary messages not supported");
            }
            Ok(Message::Ping(data)) => {
                // Axum answers pings itself
                tracing::trace!("Received ping: {} bytes", data.len());
            }
            Ok(Message::Pong(_)) => {
                tracing::trace!("Received pong");
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(
                    conn_id = %conn_id,
                    code = frame.as_ref().map(|f| f.code),
                    "WebSocket close frame received"
                );
                break;
            }
            Err(e) => {
                tracing::warn!(conn_id = %conn_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    conn_manager.unregister(&conn_id);
    send_task.abort();

    tracing::info!(
        conn_id = %conn_id,
        active_connections = conn_manager.connection_count(),
        "WebSocket client disconnected"
    );
}

/// Answer or relay one inbound frame.
fn process_message(text: &str, conn_manager: &ConnectionManager, conn_id: &str) {
    let message = match RealtimeMessage::decode(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, "Invalid message format: {}", e);
            return;
        }
    };

    if message.is_heartbeat() {
        conn_manager.send_to(conn_id, RealtimeMessage::heartbeat(now_ms()));
        return;
    }

    conn_manager.broadcast_except(conn_id, &message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use schoolhub_realtime::EventKind;
    use serde_json::json;

    #[test]
    fn test_heartbeat_is_answered_to_sender_only() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let conn1 = manager.register(tx1);
        manager.register(tx2);

        let hb = RealtimeMessage::heartbeat(5).encode().unwrap();
        process_message(&hb, &manager, &conn1);

        assert!(rx1.try_recv().unwrap().is_heartbeat());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn test_other_messages_are_relayed() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let conn1 = manager.register(tx1);
        manager.register(tx2);

        let chat = RealtimeMessage::new(EventKind::Chat, json!({"msg": "hi"}), 7);
        process_message(&chat.encode().unwrap(), &manager, &conn1);

        assert_eq!(rx2.try_recv().unwrap(), chat);
        assert!(rx1.try_recv().is_err());
    }

    #[test]
    fn test_garbage_is_dropped() {
        let manager = ConnectionManager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let conn1 = manager.register(tx1);
        manager.register(tx2);

        process_message("{not json", &manager, &conn1);
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }
}
