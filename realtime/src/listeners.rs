//! Subscriber registry keyed by event kind.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::protocol::{EventKind, RealtimeMessage};

/// Callback invoked for each inbound message of the subscribed kind.
pub type Listener = Arc<dyn Fn(&RealtimeMessage) + Send + Sync>;

/// Handle identifying one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-kind listener lists, kept in registration order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: DashMap<EventKind, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`.
    pub fn add(&self, kind: EventKind, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    /// Remove a registration. Returns false if it was already gone.
    pub fn remove(&self, kind: &EventKind, id: ListenerId) -> bool {
        let Some(mut entries) = self.listeners.get_mut(kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;

        // Clean up empty entries
        if entries.is_empty() {
            drop(entries);
            self.listeners.remove_if(kind, |_, v| v.is_empty());
        }
        removed
    }

    /// Number of listeners registered for `kind`.
    pub fn count(&self, kind: &EventKind) -> usize {
        self.listeners.get(kind).map_or(0, |entries| entries.len())
    }

    /// Invoke every listener for the message's kind, in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    /// Returns how many listeners completed normally.
    pub fn dispatch(&self, message: &RealtimeMessage) -> usize {
        // Snapshot so listeners may (un)subscribe without deadlocking the map.
        let snapshot: Vec<Listener> = match self.listeners.get(&message.kind) {
            Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for listener in snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener(message))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    tracing::error!(
                        kind = %message.kind,
                        message_id = %message.id,
                        %reason,
                        "Realtime listener panicked"
                    );
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("kinds", &self.listeners.len())
            .finish()
    }
}

/// Returned by [`crate::RealtimeClient::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    registry: Arc<ListenerRegistry>,
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    pub(crate) fn new(registry: Arc<ListenerRegistry>, kind: EventKind, id: ListenerId) -> Self {
        Self { registry, kind, id }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Stop receiving messages. Returns false if already removed.
    pub fn unsubscribe(self) -> bool {
        self.registry.remove(&self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn chat(text: &str) -> RealtimeMessage {
        RealtimeMessage::new(EventKind::Chat, json!({"msg": text}), 0)
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for n in 0..3 {
            let calls = calls.clone();
            registry.add(
                EventKind::Chat,
                Arc::new(move |_: &RealtimeMessage| calls.lock().push(n)),
            );
        }

        assert_eq!(registry.dispatch(&chat("hi")), 3);
        assert_eq!(*calls.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_dispatch_only_matching_kind() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = calls.clone();
        registry.add(
            EventKind::Announcement,
            Arc::new(move |_: &RealtimeMessage| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(registry.dispatch(&chat("hi")), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let registry = ListenerRegistry::new();
        let calls = Arc::new(AtomicU64::new(0));

        registry.add(
            EventKind::Chat,
            Arc::new(|_: &RealtimeMessage| panic!("listener bug")),
        );
        let counter = calls.clone();
        registry.add(
            EventKind::Chat,
            Arc::new(move |_: &RealtimeMessage| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(registry.dispatch(&chat("hi")), 1);
        assert_eq!(registry.dispatch(&chat("again")), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_remove() {
        let registry = ListenerRegistry::new();
        let a = registry.add(EventKind::Chat, Arc::new(|_: &RealtimeMessage| {}));
        let b = registry.add(EventKind::Chat, Arc::new(|_: &RealtimeMessage| {}));
        assert_eq!(registry.count(&EventKind::Chat), 2);

        assert!(registry.remove(&EventKind::Chat, a));
        assert!(!registry.remove(&EventKind::Chat, a));
        assert!(!registry.remove(&EventKind::Notification, b));
        assert_eq!(registry.count(&EventKind::Chat), 1);

        assert!(registry.remove(&EventKind::Chat, b));
        assert_eq!(registry.count(&EventKind::Chat), 0);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_dispatch() {
        let registry = Arc::new(ListenerRegistry::new());
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let reg = registry.clone();
        let own_id = slot.clone();
        let id = registry.add(
            EventKind::Chat,
            Arc::new(move |_: &RealtimeMessage| {
                if let Some(id) = own_id.lock().take() {
                    reg.remove(&EventKind::Chat, id);
                }
            }),
        );
        *slot.lock() = Some(id);

        assert_eq!(registry.dispatch(&chat("first")), 1);
        assert_eq!(registry.dispatch(&chat("second")), 0);
    }
}
