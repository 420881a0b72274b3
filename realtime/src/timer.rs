//! Time source for heartbeats, reconnect delays and message timestamps.

use futures::future::BoxFuture;
use std::time::Duration;

/// Clock and sleep provider used by the client.
///
/// All reconnect and heartbeat delays go through [`Timer::sleep`], so the
/// retry logic can be driven deterministically in tests.
pub trait Timer: Send + Sync + 'static {
    /// Current time in epoch milliseconds.
    fn now_ms(&self) -> u64;

    /// Complete after `duration`.
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Wall-clock timestamps with `tokio::time` sleeps.
///
/// Under `#[tokio::test(start_paused = true)]` the sleeps follow tokio's
/// virtual clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl Timer for TokioTimer {
    fn now_ms(&self) -> u64 {
        chrono::Utc::now().timestamp_millis().max(0) as u64
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
