//! Error types for the realtime channel.

/// Channel errors.
///
/// Only [`crate::RealtimeClient::connect`] returns these; everything else
/// reports failure through the connection state.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("connection failed: {0}")]
    Connect(String),

    /// A later `connect` or `disconnect` replaced this attempt
    #[error("connection attempt superseded")]
    Superseded,

    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ChannelError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ChannelError::Connect(e.to_string())
    }
}

/// Result type alias for channel operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
