//! Transport abstraction between the channel client and the wire.
//!
//! A [`Connector`] opens a [`Transport`], which is just a pair of frame
//! channels. The client never touches the socket directly, so tests can
//! swap the WebSocket for [`memory::MemoryConnector`].

pub mod memory;
pub mod ws;

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::Result;

pub use memory::{MemoryConnector, MemoryPeer, MemoryServer};
pub use ws::WsConnector;

/// A frame crossing the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A JSON-encoded message
    Text(String),
    /// Close with the given code.
    ///
    /// Inbound, this is reported exactly once, when the connection ends.
    Close(u16),
}

/// An open connection.
#[derive(Debug)]
pub struct Transport {
    /// Frames to write to the peer
    pub outgoing: mpsc::UnboundedSender<Frame>,
    /// Frames read from the peer; ends after a `Frame::Close`
    pub incoming: mpsc::UnboundedReceiver<Frame>,
}

/// Opens transports to a URL.
pub trait Connector: Send + Sync + 'static {
    fn connect(&self, url: &str) -> BoxFuture<'static, Result<Transport>>;
}
