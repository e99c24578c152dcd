//! Configuration types for groups and cache nodes.

use crate::error::Error;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default byte budget of a group's main tier.
pub const DEFAULT_MAIN_CACHE_BYTES: usize = 2 << 10;

/// Remote fetches per minute after which a key is promoted to the hot tier.
pub const DEFAULT_HOT_KEY_QPS: u64 = 10;

/// Virtual nodes per peer on the hash ring.
pub const DEFAULT_REPLICAS: usize = 50;

/// Eviction strategy used by a cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Least recently used.
    #[default]
    Lru,
    /// Least frequently used, ties broken by recency.
    Lfu,
}

impl FromStr for EvictionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LRU" => Ok(EvictionPolicy::Lru),
            "LFU" => Ok(EvictionPolicy::Lfu),
            other => Err(Error::Config(format!("unknown eviction policy: {other}"))),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionPolicy::Lru => f.write_str("LRU"),
            EvictionPolicy::Lfu => f.write_str("LFU"),
        }
    }
}

/// Per-group configuration.
#[derive(Debug, Clone)]
pub struct GroupConfig {
    /// Byte budget of the main tier, 0 for unbounded.
    pub main_cache_bytes: usize,

    /// Byte budget of the hot tier. Defaults to an eighth of the main tier.
    pub hot_cache_bytes: Option<usize>,

    /// Remote fetches per minute that promote a key into the hot tier.
    pub hot_key_qps: u64,

    /// Eviction strategy for both tiers.
    pub eviction: EvictionPolicy,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            main_cache_bytes: DEFAULT_MAIN_CACHE_BYTES,
            hot_cache_bytes: None,
            hot_key_qps: DEFAULT_HOT_KEY_QPS,
            eviction: EvictionPolicy::Lru,
        }
    }
}

impl GroupConfig {
    /// Create a configuration with the given eviction policy.
    pub fn new(eviction: EvictionPolicy) -> Self {
        Self {
            eviction,
            ..Default::default()
        }
    }

    /// Set the main tier budget. Unless set explicitly, the hot tier follows at 1/8.
    pub fn with_main_cache_bytes(mut self, bytes: usize) -> Self {
        self.main_cache_bytes = bytes;
        self
    }

    /// Set the hot tier budget.
    pub fn with_hot_cache_bytes(mut self, bytes: usize) -> Self {
        self.hot_cache_bytes = Some(bytes);
        self
    }

    /// Set the promotion threshold in remote fetches per minute.
    pub fn with_hot_key_qps(mut self, qps: u64) -> Self {
        self.hot_key_qps = qps;
        self
    }

    /// Set the eviction policy.
    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    /// Effective hot tier budget.
    pub fn hot_cache_bytes(&self) -> usize {
        self.hot_cache_bytes.unwrap_or(self.main_cache_bytes / 8)
    }
}

/// Configuration of a cache node: its peer server and the peer set.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Address the peer server binds to. Port 0 picks a free port.
    pub bind_addr: SocketAddr,

    /// This node's identity on the ring, as written in `peers`. Defaults to
    /// the bound address, with a wildcard IP replaced by loopback.
    pub advertise_addr: Option<String>,

    /// Addresses of every node in the cluster, this one included.
    pub peers: Vec<String>,

    /// Virtual nodes per peer on the hash ring.
    pub replicas: usize,

    /// Peer client settings.
    pub transport: TransportConfig,
}

impl NodeConfig {
    /// Create a configuration binding to `bind_addr`.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            advertise_addr: None,
            peers: Vec::new(),
            replicas: DEFAULT_REPLICAS,
            transport: TransportConfig::default(),
        }
    }

    /// Set the address other peers know this node by.
    pub fn with_advertise_addr(mut self, addr: impl Into<String>) -> Self {
        self.advertise_addr = Some(addr.into());
        self
    }

    /// Set the cluster's peer addresses.
    pub fn with_peers<I, S>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    /// Set the number of virtual nodes per peer.
    pub fn with_replicas(mut self, replicas: usize) -> Self {
        self.replicas = replicas;
        self
    }

    /// Set the transport configuration.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }
}

/// Peer client timeouts.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Timeout for a whole request, connect included.
    pub request_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_defaults() {
        let config = GroupConfig::default();
        assert_eq!(config.main_cache_bytes, 2048);
        assert_eq!(config.hot_cache_bytes(), 256);
        assert_eq!(config.hot_key_qps, 10);
        assert_eq!(config.eviction, EvictionPolicy::Lru);
    }

    #[test]
    fn test_hot_tier_follows_main() {
        let config = GroupConfig::default().with_main_cache_bytes(8000);
        assert_eq!(config.hot_cache_bytes(), 1000);

        let config = config.with_hot_cache_bytes(64);
        assert_eq!(config.hot_cache_bytes(), 64);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("LRU".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lru);
        assert_eq!("lfu".parse::<EvictionPolicy>().unwrap(), EvictionPolicy::Lfu);
        assert!(matches!(
            "ARC".parse::<EvictionPolicy>(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_node_config_builder() {
        let config = NodeConfig::new("127.0.0.1:0".parse().unwrap())
            .with_peers(["127.0.0.1:8001", "127.0.0.1:8002"])
            .with_replicas(3);
        assert_eq!(config.peers.len(), 2);
        assert_eq!(config.replicas, 3);
        assert!(config.advertise_addr.is_none());

        let config = config.with_advertise_addr("cache-1:8001");
        assert_eq!(config.advertise_addr.as_deref(), Some("cache-1:8001"));
    }
}
