//! Per-key mutual exclusion.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

/// A table of independently locked slots, one per key.
///
/// Holding one slot's mutex never blocks work on another key; the table-wide
/// lock is held only long enough to find or insert a slot. A slot is dropped
/// only while nobody else holds it, so every caller for a key that is in
/// flight contends on the same mutex.
pub(crate) struct KeyedLocks<K, T> {
    slots: RwLock<HashMap<K, Arc<Mutex<T>>>>,
}

impl<K, T> KeyedLocks<K, T>
where
    K: Eq + Hash + Clone,
    T: Default,
{
    pub(crate) fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the slot for `key`, creating an empty one on first use.
    pub(crate) fn slot(&self, key: &K) -> Arc<Mutex<T>> {
        if let Some(slot) = self.slots.read().get(key) {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write();
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Returns the slot for `key` only if one was created before.
    pub(crate) fn existing(&self, key: &K) -> Option<Arc<Mutex<T>>> {
        self.slots.read().get(key).map(Arc::clone)
    }

    /// Drops the slot for `key` if no caller holds it and its value is `idle`.
    pub(crate) fn remove_if(&self, key: &K, idle: impl Fn(&T) -> bool) -> bool {
        let mut slots = self.slots.write();
        // Clones are only handed out under the table lock, so a count of one
        // cannot grow while it is held.
        let removable = match slots.get(key) {
            Some(slot) if Arc::strong_count(slot) == 1 => {
                slot.try_lock().is_some_and(|value| idle(&*value))
            }
            _ => false,
        };
        if removable {
            slots.remove(key);
        }
        removable
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Keys currently present in the table that satisfy `filter`.
    pub(crate) fn keys_where(&self, filter: impl Fn(&K) -> bool) -> Vec<K> {
        self.slots
            .read()
            .keys()
            .filter(|k| filter(k))
            .cloned()
            .collect()
    }
}
