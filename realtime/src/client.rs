//! The realtime channel client.
//!
//! One client owns at most one live transport. Everything that touches the
//! connection (the outbound sender, the offline queue, the retry counter and
//! the background tasks) lives behind a single lock in [`Link`], and each
//! attached transport gets a fresh epoch so that late events from a
//! superseded connection are ignored.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::listeners::{ListenerRegistry, Subscription};
use crate::protocol::{close_code, EventKind, RealtimeMessage};
use crate::timer::{Timer, TokioTimer};
use crate::transport::{Connector, Frame, Transport, WsConnector};

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Retries exhausted or the last `connect` failed
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Realtime channel client. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    timer: Arc<dyn Timer>,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Link>,
    listeners: Arc<ListenerRegistry>,
}

#[derive(Default)]
struct Link {
    /// Set only while connected
    outgoing: Option<mpsc::UnboundedSender<Frame>>,
    /// Messages sent while disconnected, oldest first
    pending: VecDeque<RealtimeMessage>,
    attempts: u32,
    epoch: u64,
    credential: Option<String>,
    heartbeat: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    reconnect: Option<JoinHandle<()>>,
}

impl Link {
    fn abort_tasks(&mut self) {
        for handle in [
            self.heartbeat.take(),
            self.reader.take(),
            self.reconnect.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}

impl RealtimeClient {
    /// Client over WebSockets with tokio timers.
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_parts(config, Arc::new(WsConnector), Arc::new(TokioTimer))
    }

    /// Client over a custom transport, with tokio timers.
    pub fn with_connector(config: ChannelConfig, connector: impl Connector) -> Self {
        Self::with_parts(config, Arc::new(connector), Arc::new(TokioTimer))
    }

    pub fn with_parts(
        config: ChannelConfig,
        connector: Arc<dyn Connector>,
        timer: Arc<dyn Timer>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                timer,
                state,
                link: Mutex::new(Link::default()),
                listeners: Arc::new(ListenerRegistry::new()),
            }),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// Open the channel using `credential` as the `token` query parameter.
    ///
    /// Queued messages are flushed as soon as the transport is up. A no-op
    /// if already connected; cancels any pending reconnect otherwise.
    ///
    /// Fails with [`ChannelError::Superseded`] if `disconnect` or another
    /// `connect` runs before this transport opens.
    pub async fn connect(&self, credential: impl Into<String>) -> Result<()> {
        let credential = credential.into();
        let epoch = {
            let mut link = self.inner.link.lock();
            if self.state() == ConnectionState::Connected && link.outgoing.is_some() {
                return Ok(());
            }
            if let Some(handle) = link.reconnect.take() {
                handle.abort();
            }
            link.credential = Some(credential.clone());
            link.epoch += 1;
            self.inner.set_state(ConnectionState::Connecting);
            link.epoch
        };

        tracing::info!(endpoint = %self.inner.config.endpoint, "Connecting realtime channel");

        match self.inner.open(&credential, epoch).await {
            Ok(()) => Ok(()),
            Err(ChannelError::Superseded) => {
                tracing::debug!("Realtime connect superseded");
                Err(ChannelError::Superseded)
            }
            Err(e) => {
                tracing::error!(error = %e, "Realtime connect failed");
                let link = self.inner.link.lock();
                if link.epoch == epoch {
                    self.inner.set_state(ConnectionState::Error);
                }
                Err(e)
            }
        }
    }

    /// Close the channel with code 1000. Queued messages are kept.
    pub fn disconnect(&self) {
        let mut link = self.inner.link.lock();
        link.epoch += 1;
        link.abort_tasks();
        if let Some(outgoing) = link.outgoing.take() {
            let _ = outgoing.send(Frame::Close(close_code::NORMAL));
            tracing::info!("Realtime channel disconnected");
        }
        link.attempts = 0;
        self.inner.set_state(ConnectionState::Disconnected);
    }

    /// Send a message, or queue it until the next connect.
    ///
    /// Returns `true` only if the message was written to a live transport.
    pub fn send(&self, kind: impl Into<EventKind>, data: Value) -> bool {
        let message = RealtimeMessage::new(kind.into(), data, self.inner.timer.now_ms());
        let mut link = self.inner.link.lock();

        if let Some(outgoing) = &link.outgoing {
            match message.encode() {
                Ok(text) => {
                    if outgoing.send(Frame::Text(text)).is_ok() {
                        return true;
                    }
                    tracing::warn!(kind = %message.kind, "Transport write failed, queueing");
                }
                Err(e) => tracing::warn!(error = %e, "Failed to encode message"),
            }
        }

        tracing::debug!(kind = %message.kind, queued = link.pending.len() + 1, "Queued message");
        link.pending.push_back(message);
        false
    }

    /// Register `callback` for inbound messages of `kind`.
    pub fn subscribe<F>(&self, kind: impl Into<EventKind>, callback: F) -> Subscription
    where
        F: Fn(&RealtimeMessage) + Send + Sync + 'static,
    {
        let kind = kind.into();
        let id = self.inner.listeners.add(kind.clone(), Arc::new(callback));
        Subscription::new(Arc::clone(&self.inner.listeners), kind, id)
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Messages waiting for the next connect.
    pub fn queued_len(&self) -> usize {
        self.inner.link.lock().pending.len()
    }

    /// Reconnect attempts since the last successful connect.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.link.lock().attempts
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("endpoint", &self.inner.config.endpoint)
            .field("state", &self.state())
            .finish()
    }
}

impl Inner {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Realtime state changed");
        }
    }

    async fn open(self: &Arc<Self>, credential: &str, epoch: u64) -> Result<()> {
        let url = self.config.url_for(credential)?;
        let transport = self.connector.connect(&url).await?;
        if self.attach(transport, epoch) {
            Ok(())
        } else {
            Err(ChannelError::Superseded)
        }
    }

    /// Install a freshly opened transport, unless `expected_epoch` has been
    /// superseded in the meantime. Returns whether it was installed.
    fn attach(self: &Arc<Self>, transport: Transport, expected_epoch: u64) -> bool {
        let Transport { outgoing, incoming } = transport;
        let mut link = self.link.lock();

        if link.epoch != expected_epoch {
            tracing::debug!("Discarding superseded connection");
            let _ = outgoing.send(Frame::Close(close_code::NORMAL));
            return false;
        }

        link.epoch += 1;
        let epoch = link.epoch;
        link.attempts = 0;
        // Called from inside the reconnect task itself; drop without aborting.
        link.reconnect = None;

        let queued = link.pending.len();
        while let Some(message) = link.pending.pop_front() {
            let sent = match message.encode() {
                Ok(text) => outgoing.send(Frame::Text(text)).is_ok(),
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping unencodable queued message");
                    continue;
                }
            };
            if !sent {
                link.pending.push_front(message);
                break;
            }
        }
        if queued > 0 {
            tracing::info!(
                flushed = queued - link.pending.len(),
                "Flushed queued messages"
            );
        }

        link.outgoing = Some(outgoing);
        let weak = Arc::downgrade(self);
        if !self.config.heartbeat_interval.is_zero() {
            link.heartbeat = Some(tokio::spawn(heartbeat_loop(weak.clone(), epoch)));
        }
        link.reader = Some(tokio::spawn(read_loop(weak, incoming, epoch)));

        self.set_state(ConnectionState::Connected);
        tracing::info!("Realtime channel connected");
        true
    }

    fn handle_close(self: &Arc<Self>, epoch: u64, code: u16) {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            return;
        }

        link.outgoing = None;
        if let Some(handle) = link.heartbeat.take() {
            handle.abort();
        }
        // The reader is the caller.
        link.reader = None;

        if code == close_code::NORMAL {
            tracing::info!("Realtime channel closed by server");
            self.set_state(ConnectionState::Disconnected);
            return;
        }

        tracing::warn!(code, "Realtime channel closed abnormally");
        self.schedule_reconnect(&mut link);
    }

    fn schedule_reconnect(self: &Arc<Self>, link: &mut Link) {
        let max = self.config.max_reconnect_attempts;
        if link.attempts >= max {
            tracing::error!(attempts = link.attempts, "Reconnect attempts exhausted");
            self.set_state(ConnectionState::Error);
            return;
        }

        link.attempts += 1;
        let attempt = link.attempts;
        let epoch = link.epoch;
        self.set_state(ConnectionState::Reconnecting);
        tracing::info!(attempt, max, "Scheduling reconnect");

        let delay = self.timer.sleep(self.config.reconnect_interval);
        let weak = Arc::downgrade(self);
        link.reconnect = Some(tokio::spawn(async move {
            delay.await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let credential = inner.link.lock().credential.clone().unwrap_or_default();
            if let Err(e) = inner.open(&credential, epoch).await {
                tracing::warn!(attempt, error = %e, "Reconnect attempt failed");
                inner.retry_failed(epoch);
            }
        }));
    }

    fn retry_failed(self: &Arc<Self>, epoch: u64) {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            return;
        }
        link.reconnect = None;
        self.schedule_reconnect(&mut link);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let link = self.link.get_mut();
        link.abort_tasks();
        if let Some(outgoing) = link.outgoing.take() {
            let _ = outgoing.send(Frame::Close(close_code::NORMAL));
        }
    }
}

async fn heartbeat_loop(inner: Weak<Inner>, epoch: u64) {
    loop {
        let delay = match inner.upgrade() {
            Some(inner) => inner.timer.sleep(inner.config.heartbeat_interval),
            None => return,
        };
        delay.await;

        let Some(inner) = inner.upgrade() else {
            return;
        };
        let link = inner.link.lock();
        if link.epoch != epoch {
            return;
        }
        let Some(outgoing) = &link.outgoing else {
            return;
        };
        match RealtimeMessage::heartbeat(inner.timer.now_ms()).encode() {
            Ok(text) => {
                if outgoing.send(Frame::Text(text)).is_err() {
                    return;
                }
                tracing::trace!("Heartbeat sent");
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode heartbeat"),
        }
    }
}

async fn read_loop(inner: Weak<Inner>, mut incoming: mpsc::UnboundedReceiver<Frame>, epoch: u64) {
    let code = loop {
        match incoming.recv().await {
            Some(Frame::Text(text)) => {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                match RealtimeMessage::decode(&text) {
                    Ok(message) if message.is_heartbeat() => {
                        tracing::trace!("Heartbeat received");
                    }
                    Ok(message) => {
                        let delivered = inner.listeners.dispatch(&message);
                        tracing::trace!(kind = %message.kind, delivered, "Dispatched message");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to decode inbound frame"),
                }
            }
            Some(Frame::Close(code)) => break code,
            None => break close_code::ABNORMAL,
        }
    };

    if let Some(inner) = inner.upgrade() {
        inner.handle_close(epoch, code);
    }
}
