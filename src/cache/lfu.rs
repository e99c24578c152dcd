//! Least-frequently-used eviction store.
//!
//! Every entry carries an access count starting at 1. Entries with the same
//! count share one list, most recently touched at the front, so eviction takes
//! the back of the list at the minimum count: lowest frequency first, least
//! recently touched among equals.
//!
//! ```text
//!   min_freq = 1
//!   freq 1: [e] ◄──► [d]          ← evict d first
//!   freq 2: [b]
//!   freq 5: [a] ◄──► [c]
//! ```

use super::list::{IntrusiveList, SlotId};
use super::store::{entry_size, OnEvicted, Store};
use crate::types::ByteView;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug)]
struct Entry {
    key: String,
    value: ByteView,
    freq: u64,
}

/// Byte-bounded LFU store with LRU tie-breaking.
pub struct LfuStore {
    capacity: usize,
    bytes: usize,
    min_freq: u64,
    buckets: BTreeMap<u64, IntrusiveList<Entry>>,
    index: HashMap<String, (u64, SlotId)>,
    on_evicted: Option<OnEvicted>,
}

impl LfuStore {
    /// Create a store holding at most `capacity` bytes (0 = unbounded).
    pub fn new(capacity: usize, on_evicted: Option<OnEvicted>) -> Self {
        Self {
            capacity,
            bytes: 0,
            min_freq: 0,
            buckets: BTreeMap::new(),
            index: HashMap::new(),
            on_evicted,
        }
    }

    /// Access count of a key.
    pub fn frequency(&self, key: &str) -> Option<u64> {
        self.index.get(key).map(|&(freq, _)| freq)
    }

    /// Smallest access count currently tracked, 0 when empty.
    pub fn min_frequency(&self) -> u64 {
        self.min_freq
    }

    // Move an entry from its bucket to the front of the next one.
    fn touch(&mut self, key: &str) -> Option<&mut Entry> {
        let (freq, id) = *self.index.get(key)?;
        let bucket = self.buckets.get_mut(&freq)?;
        let mut entry = bucket.remove(id)?;
        if bucket.is_empty() {
            self.buckets.remove(&freq);
            if self.min_freq == freq {
                self.min_freq += 1;
            }
        }

        entry.freq += 1;
        let next = entry.freq;
        let bucket = self.buckets.entry(next).or_default();
        let new_id = bucket.push_front(entry);
        if let Some(slot) = self.index.get_mut(key) {
            *slot = (next, new_id);
        }
        bucket.get_mut(new_id)
    }

    fn remove_least_frequent(&mut self) -> bool {
        let freq = self.min_freq;
        let Some(bucket) = self.buckets.get_mut(&freq) else {
            return false;
        };
        let Some(entry) = bucket.pop_back() else {
            return false;
        };
        if bucket.is_empty() {
            self.buckets.remove(&freq);
            self.min_freq = self.buckets.keys().next().copied().unwrap_or(0);
        }

        self.index.remove(&entry.key);
        self.bytes -= entry_size(&entry.key, &entry.value);
        if let Some(cb) = &self.on_evicted {
            cb(&entry.key, &entry.value);
        }
        true
    }
}

impl Store for LfuStore {
    fn get(&mut self, key: &str) -> Option<ByteView> {
        self.touch(key).map(|e| e.value.clone())
    }

    fn add(&mut self, key: &str, value: ByteView) {
        if self.index.contains_key(key) {
            let new_len = value.len();
            let mut old_len = 0;
            if let Some(entry) = self.touch(key) {
                old_len = entry.value.len();
                entry.value = value;
            }
            self.bytes = self.bytes + new_len - old_len;
        } else {
            self.bytes += entry_size(key, &value);
            let id = self.buckets.entry(1).or_default().push_front(Entry {
                key: key.to_owned(),
                value,
                freq: 1,
            });
            self.index.insert(key.to_owned(), (1, id));
            self.min_freq = 1;
        }

        while self.capacity != 0 && self.bytes > self.capacity {
            if !self.remove_least_frequent() {
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

impl fmt::Debug for LfuStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LfuStore")
            .field("capacity", &self.capacity)
            .field("bytes", &self.bytes)
            .field("len", &self.index.len())
            .field("min_freq", &self.min_freq)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> (OnEvicted, Arc<Mutex<Vec<String>>>) {
        let evicted = Arc::new(Mutex::new(Vec::new()));
        let sink = evicted.clone();
        let cb: OnEvicted = Arc::new(move |key: &str, _: &ByteView| sink.lock().push(key.to_owned()));
        (cb, evicted)
    }

    #[test]
    fn test_new_entry_evicts_colder_one() {
        let mut lfu = LfuStore::new(9, None);
        lfu.add("key1", ByteView::from("1"));
        lfu.add("key2", ByteView::from("2"));

        assert!(lfu.get("key1").is_none());
        assert_eq!(lfu.get("key2"), Some(ByteView::from("2")));
        assert!(lfu.get("key3").is_none());
    }

    #[test]
    fn test_frequency_counts_accesses() {
        let mut lfu = LfuStore::new(0, None);
        lfu.add("a", ByteView::from("1"));
        assert_eq!(lfu.frequency("a"), Some(1));

        lfu.get("a");
        lfu.get("a");
        assert_eq!(lfu.frequency("a"), Some(3));

        lfu.add("a", ByteView::from("2"));
        assert_eq!(lfu.frequency("a"), Some(4));
        assert_eq!(lfu.min_frequency(), 4);
    }

    #[test]
    fn test_evicts_lowest_frequency() {
        let (cb, evicted) = recorder();
        // Three 2-byte entries fit.
        let mut lfu = LfuStore::new(6, Some(cb));
        lfu.add("a", ByteView::from("1"));
        lfu.add("b", ByteView::from("2"));
        lfu.add("c", ByteView::from("3"));
        lfu.get("a");
        lfu.get("a");
        lfu.get("c");

        lfu.add("d", ByteView::from("4"));

        assert_eq!(*evicted.lock(), vec!["b".to_string()]);
        assert!(lfu.get("a").is_some());
        assert!(lfu.get("c").is_some());
    }

    #[test]
    fn test_ties_broken_by_recency() {
        let (cb, evicted) = recorder();
        let mut lfu = LfuStore::new(6, Some(cb));
        lfu.add("a", ByteView::from("1"));
        lfu.add("b", ByteView::from("2"));
        lfu.add("c", ByteView::from("3"));
        lfu.get("b");
        lfu.get("a");
        lfu.get("c");

        // All at freq 2; growing c pushes it to freq 3 and b is the oldest left.
        lfu.add("c", ByteView::from("333"));
        assert_eq!(*evicted.lock(), vec!["b".to_string()]);

        // a joins c at freq 3 and is fresher, so c goes.
        lfu.add("a", ByteView::from("444"));
        assert_eq!(*evicted.lock(), vec!["b".to_string(), "c".to_string()]);
        assert_eq!(lfu.bytes(), 4);
    }

    #[test]
    fn test_min_frequency_rederived_after_eviction() {
        let (cb, evicted) = recorder();
        let mut lfu = LfuStore::new(6, Some(cb));
        lfu.add("a", ByteView::from("1"));
        lfu.add("b", ByteView::from("2"));
        lfu.get("a");
        lfu.get("b");
        lfu.get("b");
        lfu.add("c", ByteView::from("3"));
        assert_eq!(lfu.min_frequency(), 1);

        // Growing b needs two evictions: c at freq 1, then a at freq 2.
        lfu.add("b", ByteView::from("12345"));

        assert_eq!(*evicted.lock(), vec!["c".to_string(), "a".to_string()]);
        assert_eq!(lfu.len(), 1);
        assert_eq!(lfu.bytes(), 6);
        assert_eq!(lfu.min_frequency(), 4);
    }

    #[test]
    fn test_update_adjusts_bytes() {
        let mut lfu = LfuStore::new(0, None);
        lfu.add("key", ByteView::from("1"));
        lfu.add("key", ByteView::from("123"));
        assert_eq!(lfu.bytes(), 6);
        lfu.add("key", ByteView::from(""));
        assert_eq!(lfu.bytes(), 3);
        assert_eq!(lfu.len(), 1);
    }

    #[test]
    fn test_bytes_never_exceed_capacity() {
        let mut lfu = LfuStore::new(40, None);
        for i in 0..300 {
            let key = format!("k{}", i % 23);
            lfu.add(&key, ByteView::from("v".repeat(i % 7).as_str()));
            if i % 2 == 0 {
                lfu.get(&format!("k{}", i % 4));
            }
            assert!(lfu.bytes() <= 40);
        }
    }
}
