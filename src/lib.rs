//! Embeddable distributed in-memory cache.
//!
//! Every process holds a local shard of the cache. Peers split the key space
//! with a consistent hash ring, so each key has exactly one owner that loads
//! it from the data source and keeps it; other peers ask the owner.
//!
//! # Features
//!
//! - Named groups, each with its own data source and byte budget
//! - Two tiers per group: main (owned keys) and hot (popular remote keys)
//! - LRU or LFU eviction with byte-accounted capacity
//! - Single-flight loading: concurrent misses of a key cost one load
//! - Hot-key promotion once a remote key is fetched often enough
//! - Length-prefixed `bincode` peer protocol over TCP
//!
//! # Example
//!
//! ```rust
//! use macchiato::group::GetterFn;
//! use macchiato::{GroupConfig, Registry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new();
//!     let scores = registry.new_group(
//!         "scores",
//!         GroupConfig::default(),
//!         GetterFn::new(|key: &str| match key {
//!             "Tom" => Ok(b"630".to_vec()),
//!             _ => Err(format!("{} not exist", key).into()),
//!         }),
//!     )?;
//!
//!     // Loaded from the data source, then served from the main tier.
//!     assert_eq!(scores.get("Tom").await?.to_string_lossy(), "630");
//!     assert_eq!(scores.get("Tom").await?.to_string_lossy(), "630");
//!     assert_eq!(scores.stats().local_loads, 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Application Layer                │
//! └─────────────────────────────────────────────┘
//!                     │ Group::get(key)
//!                     ▼
//! ┌─────────────────────────────────────────────┐
//! │                   Group                     │
//! │  hot tier → main tier → single-flight load  │
//! └─────────────────────────────────────────────┘
//!                     │
//!     ┌───────────────┴───────────────┐
//!     ▼                               ▼
//! ┌───────────────────┐       ┌───────────────┐
//! │ PeerPool          │       │ Getter        │
//! │ HashRing + TCP    │       │ (data source) │
//! └───────────────────┘       └───────────────┘
//!     │
//!     ▼
//! ┌───────────────────┐
//! │ NetworkServer of  │
//! │ the owning peer   │
//! └───────────────────┘
//! ```
//!
//! # Consistency Model
//!
//! Values are never invalidated or updated: a key is loaded once by its
//! owner and served until evicted. Peers are not kept consistent with each
//! other; a promoted hot copy may outlive the owner's copy.

pub mod cache;
pub mod cluster;
pub mod config;
pub mod error;
pub mod group;
pub mod metrics;
pub mod network;
pub mod node;
pub mod partitioning;
pub mod singleflight;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use cache::{Cache, EvictionStore, LfuStore, LruStore, Store};
pub use config::{EvictionPolicy, GroupConfig, NodeConfig, TransportConfig};
pub use error::{BoxError, Error, NetworkError, Result};
pub use group::{get_group, new_group, Getter, GetterFn, Group, GroupBuilder, Registry};
pub use node::CacheNode;
pub use types::{ByteView, PeerId};

// Re-export cluster types
pub use cluster::{PeerGetter, PeerPicker, PeerPool};

// Re-export partitioning types
pub use partitioning::HashRing;

// Re-export metrics types
pub use metrics::{Counter, GroupMetrics, GroupStats};

// Re-export testing types
pub use testing::{MapSource, TestCluster};
