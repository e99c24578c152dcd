//! Least-recently-used eviction store.
//!
//! Entries live in an [`IntrusiveList`] ordered from most to least recently
//! touched; a hash index maps each key to its node. Capacity is counted in
//! bytes (`key.len() + value.len()` per entry), and every `add` evicts from the
//! tail until the total fits again.

use super::list::{IntrusiveList, SlotId};
use super::store::{entry_size, OnEvicted, Store};
use crate::types::ByteView;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug)]
struct Entry {
    key: String,
    value: ByteView,
}

/// Byte-bounded LRU store.
pub struct LruStore {
    capacity: usize,
    bytes: usize,
    order: IntrusiveList<Entry>,
    index: HashMap<String, SlotId>,
    on_evicted: Option<OnEvicted>,
}

impl LruStore {
    /// Create a store holding at most `capacity` bytes (0 = unbounded).
    pub fn new(capacity: usize, on_evicted: Option<OnEvicted>) -> Self {
        Self {
            capacity,
            bytes: 0,
            order: IntrusiveList::new(),
            index: HashMap::new(),
            on_evicted,
        }
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().map(|e| e.key.clone()).collect()
    }

    fn remove_oldest(&mut self) -> bool {
        let Some(entry) = self.order.pop_back() else {
            return false;
        };
        self.index.remove(&entry.key);
        self.bytes -= entry_size(&entry.key, &entry.value);
        if let Some(cb) = &self.on_evicted {
            cb(&entry.key, &entry.value);
        }
        true
    }
}

impl Store for LruStore {
    fn get(&mut self, key: &str) -> Option<ByteView> {
        let id = *self.index.get(key)?;
        self.order.move_to_front(id);
        self.order.get(id).map(|e| e.value.clone())
    }

    fn add(&mut self, key: &str, value: ByteView) {
        if let Some(&id) = self.index.get(key) {
            self.order.move_to_front(id);
            if let Some(entry) = self.order.get_mut(id) {
                self.bytes = self.bytes + value.len() - entry.value.len();
                entry.value = value;
            }
        } else {
            self.bytes += entry_size(key, &value);
            let id = self.order.push_front(Entry {
                key: key.to_owned(),
                value,
            });
            self.index.insert(key.to_owned(), id);
        }

        while self.capacity != 0 && self.bytes > self.capacity {
            if !self.remove_oldest() {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.index.len()
    }

    fn bytes(&self) -> usize {
        self.bytes
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

impl fmt::Debug for LruStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("capacity", &self.capacity)
            .field("bytes", &self.bytes)
            .field("len", &self.index.len())
            .finish()
    }
}
