//! Cache notifications
//!
//! A small multi-subscriber callback registry. The cache owns one and
//! publishes to it synchronously, after the mutation an event describes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::value::Value;

// == Cache Event ==
/// Something observable that happened inside a cache.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// A value was stored (after forced-string coercion, before cloning)
    Set { key: String, value: Value },
    /// An entry was removed; carries the stored value
    Del { key: String, value: Value },
    /// An entry was found past its expiry
    Expired { key: String, value: Value },
    /// All entries and statistics were cleared
    Flush,
    /// Statistics were reset
    FlushStats,
}

/// Discriminant of [`CacheEvent`], for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Set,
    Del,
    Expired,
    Flush,
    FlushStats,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Set => "set",
            EventKind::Del => "del",
            EventKind::Expired => "expired",
            EventKind::Flush => "flush",
            EventKind::FlushStats => "flush_stats",
        }
    }
}

impl CacheEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CacheEvent::Set { .. } => EventKind::Set,
            CacheEvent::Del { .. } => EventKind::Del,
            CacheEvent::Expired { .. } => EventKind::Expired,
            CacheEvent::Flush => EventKind::Flush,
            CacheEvent::FlushStats => EventKind::FlushStats,
        }
    }

    /// Notification name: `set`, `del`, `expired`, `flush` or `flush_stats`.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Key the event concerns, if any.
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheEvent::Set { key, .. }
            | CacheEvent::Del { key, .. }
            | CacheEvent::Expired { key, .. } => Some(key),
            CacheEvent::Flush | CacheEvent::FlushStats => None,
        }
    }

    /// Value the event carries, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            CacheEvent::Set { value, .. }
            | CacheEvent::Del { value, .. }
            | CacheEvent::Expired { value, .. } => Some(value),
            CacheEvent::Flush | CacheEvent::FlushStats => None,
        }
    }
}

// == Notifier ==
/// Handle returned by [`Notifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Fire-and-forget publish/subscribe registry.
#[derive(Default)]
pub struct Notifier {
    listeners: RwLock<Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for every event.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Delivers `event` to every listener registered at the time of the call.
    ///
    /// Listeners run without the registry lock held, so they may subscribe,
    /// unsubscribe or publish themselves.
    pub fn publish(&self, event: &CacheEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
