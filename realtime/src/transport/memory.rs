//! In-process transport for tests and embedding.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use super::{Connector, Frame, Transport};
use crate::error::{ChannelError, Result};
use crate::protocol::RealtimeMessage;

/// Connector whose connections are accepted by a paired [`MemoryServer`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    available: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
    accept_tx: mpsc::UnboundedSender<MemoryPeer>,
}

/// Accept side of a [`MemoryConnector`].
#[derive(Debug)]
pub struct MemoryServer {
    accept_rx: mpsc::UnboundedReceiver<MemoryPeer>,
}

/// Server end of one in-memory connection.
///
/// Dropping the peer without calling [`MemoryPeer::close`] looks like an
/// abnormal closure to the client.
#[derive(Debug)]
pub struct MemoryPeer {
    pub url: String,
    to_client: mpsc::UnboundedSender<Frame>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryServer) {
        let (accept_tx, accept_rx) = mpsc::unbounded_channel();
        (
            Self {
                available: Arc::new(AtomicBool::new(true)),
                attempts: Arc::new(AtomicUsize::new(0)),
                accept_tx,
            },
            MemoryServer { accept_rx },
        )
    }

    /// Refuse (false) or accept (true) subsequent connection attempts.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Total connection attempts, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Transport>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let result = if self.available.load(Ordering::SeqCst) {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            let peer = MemoryPeer {
                url: url.to_string(),
                to_client: in_tx,
                from_client: out_rx,
            };
            self.accept_tx
                .send(peer)
                .map(|_| Transport {
                    outgoing: out_tx,
                    incoming: in_rx,
                })
                .map_err(|_| ChannelError::Connect("memory server is gone".into()))
        } else {
            Err(ChannelError::Connect("connection refused".into()))
        };

        Box::pin(async move { result })
    }
}

impl MemoryServer {
    /// Wait for the next client connection.
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.recv().await
    }

    /// Take a pending connection without waiting.
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accept_rx.try_recv().ok()
    }
}

impl MemoryPeer {
    /// Next raw frame from the client.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        self.from_client.recv().await
    }

    /// Next decodable message from the client. Returns `None` once the
    /// client closes or goes away.
    pub async fn recv_message(&mut self) -> Option<RealtimeMessage> {
        loop {
            match self.from_client.recv().await? {
                Frame::Text(text) => match RealtimeMessage::decode(&text) {
                    Ok(message) => return Some(message),
                    Err(e) => tracing::warn!(error = %e, "Undecodable frame from client"),
                },
                Frame::Close(_) => return None,
            }
        }
    }

    /// Drain every frame already sent by the client.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Deliver a message to the client.
    pub fn push(&self, message: &RealtimeMessage) -> bool {
        match message.encode() {
            Ok(text) => self.push_text(text),
            Err(_) => false,
        }
    }

    /// Deliver a raw text frame to the client.
    pub fn push_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(Frame::Text(text.into())).is_ok()
    }

    /// Close the connection with `code`.
    pub fn close(self, code: u16) {
        let _ = self.to_client.send(Frame::Close(code));
    }
}
