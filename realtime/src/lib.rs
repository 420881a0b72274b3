//! SchoolHub realtime channel client.
//!
//! A single persistent connection to the hub's event endpoint with automatic
//! reconnection, a keep-alive heartbeat, an offline send queue and typed
//! per-event subscriptions.
//!
//! # Example
//!
//! ```no_run
//! use schoolhub_realtime::{ChannelConfig, EventKind, RealtimeClient};
//! use serde_json::json;
//!
//! # async fn run() -> schoolhub_realtime::Result<()> {
//! let client = RealtimeClient::new(ChannelConfig::new("ws://localhost:3000/ws"));
//!
//! let _sub = client.subscribe(EventKind::Announcement, |msg| {
//!     println!("announcement: {}", msg.data);
//! });
//!
//! // Queued until the channel is up
//! client.send(EventKind::Chat, json!({"msg": "hello"}));
//! client.connect("my-token").await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod listeners;
pub mod protocol;
pub mod timer;
pub mod transport;

pub use client::{ConnectionState, RealtimeClient};
pub use config::{ChannelConfig, ConfigError};
pub use error::{ChannelError, Result};
pub use listeners::{ListenerId, ListenerRegistry, Subscription};
pub use protocol::{close_code, EventKind, RealtimeMessage};
pub use timer::{Timer, TokioTimer};
pub use transport::{
    Connector, Frame, MemoryConnector, MemoryPeer, MemoryServer, Transport, WsConnector,
};
