use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked with the payload of an emitted event
pub type Callback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies a registered listener so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered callbacks per event name
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<String, Vec<(ListenerId, Callback)>>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, event: &str, callback: Callback) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        id
    }

    /// Returns whether a listener was removed
    pub(crate) fn remove(&self, event: &str, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(callbacks) = listeners.get_mut(event) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        let removed = callbacks.len() != before;
        if callbacks.is_empty() {
            listeners.remove(event);
        }
        removed
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Invokes every callback registered for `event`, in registration order.
    ///
    /// The lock is released before the callbacks run so a callback may
    /// register or remove listeners itself.
    pub(crate) fn emit(&self, event: &str, payload: &Value) {
        let callbacks: Vec<Callback> = {
            let listeners = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match listeners.get(event) {
                Some(callbacks) => callbacks.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };
        for callback in callbacks {
            callback(payload);
        }
    }
}
