//! Sticky store: the last payload sent for each routing key.
//!
//! At most one entry exists per routing key. Entries live until they are
//! removed explicitly; there is no expiry. Entries are kept in key order so a
//! replay walks them deterministically.

use std::collections::BTreeMap;
use std::sync::Arc;

use stickybus_types::payload::Payload;
use stickybus_types::routing::RoutingKey;

/// One retained sticky value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickyEntry {
    pub key: RoutingKey,
    pub payload: Arc<Payload>,
}

/// Map from routing key to the last sticky payload.
///
/// Not synchronized on its own; the bus keeps it inside its critical section.
#[derive(Debug, Default)]
pub struct StickyStore {
    entries: BTreeMap<RoutingKey, Arc<Payload>>,
}

impl StickyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `key`, returning the replaced payload.
    pub fn upsert(&mut self, key: RoutingKey, payload: Arc<Payload>) -> Option<Arc<Payload>> {
        self.entries.insert(key, payload)
    }

    pub fn remove(&mut self, key: &RoutingKey) -> Option<Arc<Payload>> {
        self.entries.remove(key)
    }

    pub fn get(&self, key: &RoutingKey) -> Option<Arc<Payload>> {
        self.entries.get(key).cloned()
    }

    /// Copy of every entry in key order, safe to iterate while the store changes.
    pub fn snapshot(&self) -> Vec<StickyEntry> {
        self.entries
            .iter()
            .map(|(key, payload)| StickyEntry {
                key: key.clone(),
                payload: Arc::clone(payload),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(v: i64) -> Arc<Payload> {
        Arc::new(Payload::new().with("v", v))
    }

    #[test]
    fn upsert_overwrites_previous_value() {
        let mut store = StickyStore::new();
        assert!(store.upsert(RoutingKey::broadcast(7), payload(1)).is_none());
        let replaced = store.upsert(RoutingKey::broadcast(7), payload(2)).unwrap();
        assert_eq!(replaced.get_int("v"), Some(1));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&RoutingKey::broadcast(7)).unwrap().get_int("v"), Some(2));
    }

    #[test]
    fn receiver_scoped_keys_are_separate_entries() {
        let mut store = StickyStore::new();
        store.upsert(RoutingKey::broadcast(7), payload(1));
        store.upsert(RoutingKey::targeted(7, "rX"), payload(2));
        assert_eq!(store.len(), 2);
        assert!(store.remove(&RoutingKey::targeted(7, "rX")).is_some());
        assert!(store.get(&RoutingKey::broadcast(7)).is_some());
    }

    #[test]
    fn remove_missing_is_none() {
        let mut store = StickyStore::new();
        assert!(store.remove(&RoutingKey::broadcast(99)).is_none());
    }

    #[test]
    fn snapshot_is_key_ordered() {
        let mut store = StickyStore::new();
        store.upsert(RoutingKey::broadcast(9), payload(9));
        store.upsert(RoutingKey::broadcast(2), payload(2));
        store.upsert(RoutingKey::targeted(2, "a"), payload(3));
        let keys: Vec<RoutingKey> = store.snapshot().into_iter().map(|e| e.key).collect();
        assert_eq!(
            keys,
            vec![
                RoutingKey::broadcast(2),
                RoutingKey::targeted(2, "a"),
                RoutingKey::broadcast(9),
            ]
        );
    }
}
