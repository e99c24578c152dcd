//! Partitioning of the key space across peers.
//!
//! Keys are mapped to peers with a consistent hash ring. Every peer owns
//! `replicas` virtual nodes so that a handful of peers still split the ring
//! evenly, and adding or removing one peer only moves the keys adjacent to its
//! virtual nodes.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        HashRing                           │
//! │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐         │
//! │  │VN:A │→│VN:B │→│VN:C │→│VN:A │→│VN:C │→│VN:B │→ (wrap) │
//! │  └─────┘ └─────┘ └─────┘ └─────┘ └─────┘ └─────┘         │
//! │                                                           │
//! │  "Tom" → crc32 → first vnode ≥ hash → peer C              │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use macchiato::partitioning::HashRing;
//!
//! let mut ring = HashRing::new(50);
//! ring.add(["10.0.0.1:8001", "10.0.0.2:8001"]);
//!
//! let owner = ring.get("Tom").unwrap();
//! assert!(ring.contains(owner));
//! ```

mod hashring;

pub use hashring::{crc32, HashFn, HashRing};
