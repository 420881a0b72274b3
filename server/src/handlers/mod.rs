//! Request handlers for collection and realtime operations.

mod collections;
mod websocket;

pub use collections::*;
pub use websocket::handle_websocket_connection;
