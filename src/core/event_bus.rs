//! Pub/Sub bus for library mutation notifications.
//!
//! Architecture:
//! - Subscribers register per event kind (or for every kind) and are called
//!   synchronously inside `emit()`
//! - `emit()` also queues the event; `poll()` drains the queue for batch
//!   processing in the caller's update loop
//!
//! Callback order: FIFO within a kind. "All" subscribers run after the
//! kind-specific ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use log::warn;

use crate::entities::Play;

/// Maximum events in queue before oldest are evicted
const MAX_QUEUE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    PlayAdded(Arc<Play>),
    PlayUpdated(Arc<Play>),
    PlayRemoved { id: String },
    SearchCommitted { query: String },
    CacheCleared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PlayAdded,
    PlayUpdated,
    PlayRemoved,
    SearchCommitted,
    CacheCleared,
}

impl LibraryEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LibraryEvent::PlayAdded(_) => EventKind::PlayAdded,
            LibraryEvent::PlayUpdated(_) => EventKind::PlayUpdated,
            LibraryEvent::PlayRemoved { .. } => EventKind::PlayRemoved,
            LibraryEvent::SearchCommitted { .. } => EventKind::SearchCommitted,
            LibraryEvent::CacheCleared => EventKind::CacheCleared,
        }
    }
}

type Callback = Arc<dyn Fn(&LibraryEvent) + Send + Sync>;

#[derive(Default)]
struct Subscribers {
    by_kind: HashMap<EventKind, Vec<Callback>>,
    all: Vec<Callback>,
}

/// Cloneable handle; clones share subscribers and queue.
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Subscribers>>,
    queue: Arc<Mutex<Vec<LibraryEvent>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("queue_len", &self.queue_len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `callback` for every event of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F)
    where
        F: Fn(&LibraryEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .by_kind
            .entry(kind)
            .or_default()
            .push(Arc::new(callback));
    }

    /// Call `callback` for every event
    pub fn subscribe_all<F>(&self, callback: F)
    where
        F: Fn(&LibraryEvent) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .all
            .push(Arc::new(callback));
    }

    /// Invoke subscribers immediately, then queue the event for `poll()`.
    pub fn emit(&self, event: LibraryEvent) {
        // Snapshot so a callback may subscribe without deadlocking
        let callbacks: Vec<Callback> = {
            let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
            subs.by_kind
                .get(&event.kind())
                .into_iter()
                .flatten()
                .chain(subs.all.iter())
                .cloned()
                .collect()
        };
        for cb in &callbacks {
            cb(&event);
        }

        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= MAX_QUEUE_SIZE {
            let evict_count = queue.len() / 2;
            warn!("EventBus queue full ({} events), evicting oldest {}", queue.len(), evict_count);
            queue.drain(0..evict_count);
        }
        queue.push(event);
    }

    /// Drain every event emitted since the last poll.
    pub fn poll(&self) -> Vec<LibraryEvent> {
        std::mem::take(&mut *self.queue.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn unsubscribe_all(&self, kind: EventKind) {
        self.subscribers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .by_kind
            .remove(&kind);
    }

    /// Clear all subscribers and queue
    pub fn clear(&self) {
        *self.subscribers.write().unwrap_or_else(|e| e.into_inner()) = Subscribers::default();
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn has_subscribers(&self, kind: EventKind) -> bool {
        let subs = self.subscribers.read().unwrap_or_else(|e| e.into_inner());
        !subs.all.is_empty() || subs.by_kind.get(&kind).is_some_and(|v| !v.is_empty())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn removed(id: &str) -> LibraryEvent {
        LibraryEvent::PlayRemoved { id: id.to_string() }
    }

    #[test]
    fn test_subscribe_emit_immediate() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        bus.subscribe(EventKind::PlayRemoved, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(removed("a"));
        bus.emit(LibraryEvent::CacheCleared);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_all_sees_every_kind() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        bus.subscribe_all(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(removed("a"));
        bus.emit(LibraryEvent::SearchCommitted { query: "pass".into() });
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(bus.has_subscribers(EventKind::CacheCleared));
    }

    #[test]
    fn test_emit_queues_for_poll() {
        let bus = EventBus::new();
        bus.emit(removed("a"));
        bus.emit(removed("b"));

        let events = bus.poll();
        assert_eq!(events, vec![removed("a"), removed("b")]);
        assert!(bus.poll().is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let bus = EventBus::new();
        let handle = bus.clone();
        handle.emit(LibraryEvent::CacheCleared);
        assert_eq!(bus.queue_len(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        bus.subscribe(EventKind::CacheCleared, |_| {});
        assert!(bus.has_subscribers(EventKind::CacheCleared));
        bus.unsubscribe_all(EventKind::CacheCleared);
        assert!(!bus.has_subscribers(EventKind::CacheCleared));
    }

    #[test]
    fn test_queue_eviction() {
        let bus = EventBus::new();
        for i in 0..MAX_QUEUE_SIZE + 10 {
            bus.emit(removed(&i.to_string()));
        }
        let events = bus.poll();
        assert!(events.len() <= MAX_QUEUE_SIZE);
        assert_eq!(events.last(), Some(&removed(&(MAX_QUEUE_SIZE + 9).to_string())));
    }
}
