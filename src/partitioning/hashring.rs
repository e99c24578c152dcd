//! Consistent hashing implementation with virtual nodes.
//!
//! Each peer is placed on a 32-bit ring `replicas` times, at the hash of its
//! identity salted with the replica index. A key belongs to the peer owning the
//! first position at or after the key's hash, wrapping past the top.

use crate::config::DEFAULT_REPLICAS;
use crate::types::PeerId;
use crc::{Crc, CRC_32_ISO_HDLC};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Hash function placing keys and virtual nodes on the ring.
pub type HashFn = fn(&[u8]) -> u32;

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// CRC-32 (IEEE), the default ring hash.
pub fn crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// A consistent hash ring mapping keys to peers.
#[derive(Debug, Clone)]
pub struct HashRing {
    /// Ring position to owning peer, sorted by position.
    vnodes: BTreeMap<u32, PeerId>,

    /// Virtual nodes per peer.
    replicas: usize,

    /// Registered peers, sorted.
    peers: Vec<PeerId>,

    hash: HashFn,
}

impl HashRing {
    /// Create an empty ring hashing with CRC-32.
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, crc32)
    }

    /// Create an empty ring with a custom hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            vnodes: BTreeMap::new(),
            replicas: replicas.max(1),
            peers: Vec::new(),
            hash,
        }
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Number of peers on the ring.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Registered peers, sorted.
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }

    pub fn contains(&self, peer: &str) -> bool {
        self.peers.iter().any(|p| p == peer)
    }

    /// Add peers. Peers already on the ring are skipped.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<PeerId>,
    {
        for peer in peers {
            let peer = peer.into();
            if self.contains(&peer) {
                continue;
            }

            for i in 0..self.replicas {
                let position = self.vnode_position(&peer, i);
                // On a 32-bit collision the earlier peer keeps the position.
                self.vnodes.entry(position).or_insert_with(|| peer.clone());
            }
            self.peers.push(peer);
        }
        self.peers.sort();
    }

    /// Remove a peer and all of its virtual nodes.
    pub fn remove(&mut self, peer: &str) {
        if !self.contains(peer) {
            warn!(peer, "Peer not on the ring, nothing to remove");
            return;
        }

        self.peers.retain(|p| p != peer);
        for i in 0..self.replicas {
            let position = self.vnode_position(peer, i);
            if self.vnodes.get(&position).is_some_and(|owner| owner == peer) {
                self.vnodes.remove(&position);
            }
        }
    }

    /// Peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&PeerId> {
        if self.vnodes.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        self.vnodes
            .range(hash..)
            .next()
            .or_else(|| self.vnodes.iter().next())
            .map(|(_, peer)| peer)
    }

    /// Count how many of `sample_size` synthetic keys land on each peer.
    pub fn get_distribution(&self, sample_size: usize) -> HashMap<PeerId, usize> {
        let mut distribution = HashMap::new();
        for i in 0..sample_size {
            let key = format!("sample_key_{}", i);
            if let Some(owner) = self.get(&key) {
                *distribution.entry(owner.clone()).or_insert(0) += 1;
            }
        }
        distribution
    }

    fn vnode_position(&self, peer: &str, index: usize) -> u32 {
        (self.hash)(format!("{}{}", index, peer).as_bytes())
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new(DEFAULT_REPLICAS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hash a decimal string to its value, so ring positions are readable.
    fn decimal(data: &[u8]) -> u32 {
        std::str::from_utf8(data).unwrap().parse().unwrap()
    }

    fn owner(ring: &HashRing, key: &str) -> String {
        ring.get(key).cloned().unwrap_or_default()
    }

    #[test]
    fn test_empty_ring() {
        let ring = HashRing::new(3);
        assert!(ring.is_empty());
        assert!(ring.get("key").is_none());
    }

    #[test]
    fn test_lookup_with_wraparound() {
        // Positions: 2, 4, 6, 12, 14, 16, 22, 24, 26.
        let mut ring = HashRing::with_hasher(3, decimal);
        ring.add(["6", "4", "2"]);

        for (key, expected) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "2")] {
            assert_eq!(owner(&ring, key), expected, "key {}", key);
        }

        // 8, 18 and 28 now exist, so 27 moves to peer 8.
        ring.add(["8"]);
        for (key, expected) in [("2", "2"), ("11", "2"), ("23", "4"), ("27", "8")] {
            assert_eq!(owner(&ring, key), expected, "key {}", key);
        }
    }

    #[test]
    fn test_every_peer_has_replica_positions() {
        let mut ring = HashRing::with_hasher(3, decimal);
        ring.add(["6", "4", "2"]);

        assert_eq!(ring.vnodes.len(), 9);
        for peer in ring.peers() {
            let count = ring.vnodes.values().filter(|p| *p == peer).count();
            assert_eq!(count, 3);
        }
        let positions: Vec<u32> = ring.vnodes.keys().copied().collect();
        let mut sorted = positions.clone();
        sorted.sort();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_get_is_deterministic() {
        let mut ring = HashRing::new(50);
        ring.add(["127.0.0.1:8001", "127.0.0.1:8002", "127.0.0.1:8003"]);

        for i in 0..200 {
            let key = format!("key-{}", i);
            assert_eq!(ring.get(&key), ring.get(&key));
        }
    }

    #[test]
    fn test_remove_restores_previous_owners() {
        let mut ring = HashRing::new(50);
        ring.add(["127.0.0.1:8001", "127.0.0.1:8002"]);
        let keys: Vec<String> = (0..500).map(|i| format!("key-{}", i)).collect();
        let before: Vec<String> = keys.iter().map(|k| owner(&ring, k)).collect();

        ring.add(["127.0.0.1:8003"]);
        let moved = keys
            .iter()
            .zip(&before)
            .filter(|(k, b)| owner(&ring, k) != **b)
            .count();
        assert!(moved > 0);

        ring.remove("127.0.0.1:8003");
        let after: Vec<String> = keys.iter().map(|k| owner(&ring, k)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_duplicate_add() {
        let mut ring = HashRing::with_hasher(3, decimal);
        ring.add(["1"]);
        ring.add(["1"]);

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.vnodes.len(), 3);
    }

    #[test]
    fn test_remove_nonexistent() {
        let mut ring = HashRing::with_hasher(3, decimal);
        ring.add(["1"]);
        ring.remove("999");

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.vnodes.len(), 3);
    }

    #[test]
    fn test_distribution() {
        let mut ring = HashRing::new(50);
        ring.add(["127.0.0.1:8001", "127.0.0.1:8002", "127.0.0.1:8003"]);

        let distribution = ring.get_distribution(9000);
        for peer in ring.peers() {
            let count = distribution.get(peer).copied().unwrap_or(0);
            assert!(count > 500, "peer {} has {} keys", peer, count);
        }
    }
}
