//! Channel configuration.

use crate::error::{ChannelError, Result};
use std::env;
use std::time::Duration;

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(3000);
/// Default number of reconnect attempts before giving up.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Default keep-alive period.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Realtime channel configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Server endpoint, e.g. `ws://localhost:3000/ws`
    pub endpoint: String,
    /// Fixed delay before each reconnect attempt
    pub reconnect_interval: Duration,
    /// Reconnect attempts allowed before the channel enters the error state
    pub max_reconnect_attempts: u32,
    /// Period between heartbeats while connected; zero disables them
    pub heartbeat_interval: Duration,
}

impl ChannelConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn with_reconnect(mut self, interval: Duration, max_attempts: u32) -> Self {
        self.reconnect_interval = interval;
        self.max_reconnect_attempts = max_attempts;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// `REALTIME_URL` is required; the interval and attempt settings fall back
    /// to the defaults above. Intervals must be positive.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        let endpoint = env::var("REALTIME_URL").map_err(|_| ConfigError::MissingEndpoint)?;

        let reconnect_interval = env_millis("REALTIME_RECONNECT_INTERVAL_MS")?
            .unwrap_or(DEFAULT_RECONNECT_INTERVAL);

        let max_reconnect_attempts = match env::var("REALTIME_MAX_RECONNECT_ATTEMPTS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("REALTIME_MAX_RECONNECT_ATTEMPTS"))?,
            Err(_) => DEFAULT_MAX_RECONNECT_ATTEMPTS,
        };

        let heartbeat_interval = env_millis("REALTIME_HEARTBEAT_INTERVAL_MS")?
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL);

        Ok(Self {
            endpoint,
            reconnect_interval,
            max_reconnect_attempts,
            heartbeat_interval,
        })
    }

    /// The endpoint with the credential attached as a `token` query parameter.
    pub fn url_for(&self, credential: &str) -> Result<String> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ChannelError::InvalidEndpoint("endpoint is empty".into()));
        }
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        Ok(format!(
            "{endpoint}{separator}token={}",
            urlencoding::encode(credential)
        ))
    }
}

fn env_millis(name: &'static str) -> std::result::Result<Option<Duration>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(ms) if ms > 0 => Ok(Some(Duration::from_millis(ms))),
            _ => Err(ConfigError::Invalid(name)),
        },
        Err(_) => Ok(None),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("REALTIME_URL environment variable is required")]
    MissingEndpoint,

    #[error("invalid value for {0}")]
    Invalid(&'static str),
}
