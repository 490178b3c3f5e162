//! Observer registry - subscribe/unsubscribe over published session state

use crate::state::SessionState;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with every published state
pub type Listener = Arc<dyn Fn(&SessionState) + Send + Sync>;

/// Registered listeners, keyed by subscription id
pub struct Observers {
    listeners: DashMap<u64, Listener>,
    next_id: AtomicU64,
}

impl Observers {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Register a listener; it stays registered until the returned
    /// [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<F>(self: &Arc<Self>, listener: F) -> Subscription
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));

        Subscription {
            id,
            observers: Arc::downgrade(self),
        }
    }

    /// Call every listener with `state`
    ///
    /// Listeners run outside the registry lock, so they may subscribe or
    /// unsubscribe from within the callback.
    pub fn notify(&self, state: &SessionState) {
        let listeners: Vec<Listener> = self
            .listeners
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        for listener in listeners {
            listener(state);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    fn remove(&self, id: u64) {
        self.listeners.remove(&id);
    }
}

/// Handle of a registered listener
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    observers: Weak<Observers>,
}

impl Subscription {
    /// Stop receiving updates
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(observers) = self.observers.upgrade() {
            observers.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
