//! Local cache tiers.
//!
//! A [`Cache`] is one tier of a group (main or hot): a mutex around a single
//! [`EvictionStore`] that is only allocated on the first write, so tiers that
//! never receive data cost nothing.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ Cache (policy, capacity)     │
//! │  Mutex<Option<EvictionStore>>│
//! │        ├─ LruStore           │
//! │        └─ LfuStore           │
//! └──────────────────────────────┘
//! ```

mod lfu;
mod list;
mod lru;
mod store;

pub use lfu::LfuStore;
pub use lru::LruStore;
pub use store::{EvictionStore, OnEvicted, Store};

use crate::config::EvictionPolicy;
use crate::types::ByteView;
use parking_lot::Mutex;
use std::fmt;

/// A thread-safe, lazily allocated cache tier.
pub struct Cache {
    policy: EvictionPolicy,
    capacity: usize,
    on_evicted: Option<OnEvicted>,
    store: Mutex<Option<EvictionStore>>,
}

impl Cache {
    /// Create a tier with `capacity` bytes (0 = unbounded).
    pub fn new(policy: EvictionPolicy, capacity: usize) -> Self {
        Self {
            policy,
            capacity,
            on_evicted: None,
            store: Mutex::new(None),
        }
    }

    /// Install an eviction observer. Must be called before the first `add`.
    pub fn with_on_evicted(mut self, on_evicted: OnEvicted) -> Self {
        self.on_evicted = Some(on_evicted);
        self
    }

    /// Look up a key. Never allocates the store.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        self.store.lock().as_mut()?.get(key)
    }

    /// Insert or replace a key.
    pub fn add(&self, key: &str, value: ByteView) {
        let mut store = self.store.lock();
        store
            .get_or_insert_with(|| {
                EvictionStore::new(self.policy, self.capacity, self.on_evicted.clone())
            })
            .add(key, value);
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.store.lock().as_ref().map_or(0, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently accounted.
    pub fn bytes(&self) -> usize {
        self.store.lock().as_ref().map_or(0, |s| s.bytes())
    }

    /// Whether the underlying store has been allocated yet.
    pub fn is_initialized(&self) -> bool {
        self.store.lock().is_some()
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("policy", &self.policy)
            .field("capacity", &self.capacity)
            .field("store", &*self.store.lock())
            .finish()
    }
}
