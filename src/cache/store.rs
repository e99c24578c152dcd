//! Eviction store abstraction shared by the LRU and LFU variants.

use super::lfu::LfuStore;
use super::lru::LruStore;
use crate::config::EvictionPolicy;
use crate::types::ByteView;
use std::sync::Arc;

/// Observer invoked synchronously, under the tier lock, for every evicted entry.
///
/// It runs on the evicting thread; keep it fast and never block in it.
pub type OnEvicted = Arc<dyn Fn(&str, &ByteView) + Send + Sync>;

/// Bytes an entry counts against a store's capacity.
#[inline]
pub(crate) fn entry_size(key: &str, value: &ByteView) -> usize {
    key.len() + value.len()
}

/// A single-tier, byte-bounded key/value store.
pub trait Store {
    /// Look up a key, recording the access.
    fn get(&mut self, key: &str) -> Option<ByteView>;

    /// Insert or replace a key, then evict until the store fits its capacity.
    fn add(&mut self, key: &str, value: ByteView);

    /// Number of entries.
    fn len(&self) -> usize;

    /// Bytes currently accounted.
    fn bytes(&self) -> usize;

    /// Capacity in bytes, 0 for unbounded.
    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The closed set of eviction strategies.
#[derive(Debug)]
pub enum EvictionStore {
    Lru(LruStore),
    Lfu(LfuStore),
}

impl EvictionStore {
    /// Build the store matching `policy`.
    pub fn new(policy: EvictionPolicy, capacity: usize, on_evicted: Option<OnEvicted>) -> Self {
        match policy {
            EvictionPolicy::Lru => EvictionStore::Lru(LruStore::new(capacity, on_evicted)),
            EvictionPolicy::Lfu => EvictionStore::Lfu(LfuStore::new(capacity, on_evicted)),
        }
    }

    pub fn policy(&self) -> EvictionPolicy {
        match self {
            EvictionStore::Lru(_) => EvictionPolicy::Lru,
            EvictionStore::Lfu(_) => EvictionPolicy::Lfu,
        }
    }
}

impl Store for EvictionStore {
    fn get(&mut self, key: &str) -> Option<ByteView> {
        match self {
            EvictionStore::Lru(s) => s.get(key),
            EvictionStore::Lfu(s) => s.get(key),
        }
    }

    fn add(&mut self, key: &str, value: ByteView) {
        match self {
            EvictionStore::Lru(s) => s.add(key, value),
            EvictionStore::Lfu(s) => s.add(key, value),
        }
    }

    fn len(&self) -> usize {
        match self {
            EvictionStore::Lru(s) => s.len(),
            EvictionStore::Lfu(s) => s.len(),
        }
    }

    fn bytes(&self) -> usize {
        match self {
            EvictionStore::Lru(s) => s.bytes(),
            EvictionStore::Lfu(s) => s.bytes(),
        }
    }

    fn capacity(&self) -> usize {
        match self {
            EvictionStore::Lru(s) => s.capacity(),
            EvictionStore::Lfu(s) => s.capacity(),
        }
    }
}
