//! WebSocket support for realtime relay.
//!
//! Clients connect to `/ws` with the realtime channel client. Heartbeats are
//! answered, everything else is relayed to the other connections, and
//! collection mutations are announced as `data_changed` messages.

mod manager;
mod protocol;

pub use manager::ConnectionManager;
pub use protocol::*;
