//! Testing utilities.
//!
//! - [`MapSource`]: an in-memory data source that counts how often each key
//!   was loaded, optionally slowed down to exercise request coalescing.
//! - [`TestCluster`]: several [`CacheNode`]s on loopback ports in one
//!   process, each with its own registry and data source, all serving the
//!   same group.
//!
//! # Example
//!
//! ```rust,no_run
//! use macchiato::testing::{scores_db, TestCluster};
//! use macchiato::GroupConfig;
//!
//! # async fn run() -> macchiato::Result<()> {
//! let cluster = TestCluster::start(3, GroupConfig::default(), scores_db()).await?;
//! let value = cluster.nodes[0].group.get("Tom").await?;
//! assert_eq!(value.to_string_lossy(), "630");
//! cluster.shutdown().await;
//! # Ok(())
//! # }
//! ```


use crate::config::{GroupConfig, NodeConfig};
use crate::error::{BoxError, Result};
use crate::group::{Getter, Group, Registry};
use crate::node::CacheNode;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Name of the group every [`TestCluster`] node serves.
pub const TEST_GROUP: &str = "scores";

/// The classic sample data set.
pub fn scores_db() -> Vec<(String, String)> {
    [("Tom", "630"), ("Jack", "589"), ("Sam", "567")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Debug, Default)]
struct MapSourceInner {
    data: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
}

/// In-memory data source recording its calls. Clones share the counters.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    inner: Arc<MapSourceInner>,
    delay: Option<Duration>,
}

impl MapSource {
    pub fn new<I>(data: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            inner: Arc::new(MapSourceInner {
                data: data.into_iter().collect(),
                calls: Mutex::new(HashMap::new()),
            }),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of loads.
    pub fn calls(&self) -> usize {
        self.inner.calls.lock().values().sum()
    }

    /// Number of loads of `key`.
    pub fn calls_for(&self, key: &str) -> usize {
        self.inner.calls.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Getter for MapSource {
    async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, BoxError> {
        *self.inner.calls.lock().entry(key.to_string()).or_insert(0) += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.inner.data.get(key) {
            Some(value) => Ok(value.as_bytes().to_vec()),
            None => Err(format!("{} not exist", key).into()),
        }
    }
}

/// One member of a [`TestCluster`].
#[derive(Debug)]
pub struct TestNode {
    pub node: CacheNode,
    pub group: Arc<Group>,
    pub source: MapSource,
}

impl TestNode {
    pub fn addr(&self) -> String {
        self.node.addr().to_string()
    }
}

/// A cluster of cache nodes on loopback.
#[derive(Debug)]
pub struct TestCluster {
    pub nodes: Vec<TestNode>,
}

impl TestCluster {
    /// Start `count` nodes serving [`TEST_GROUP`] from `data`.
    ///
    /// Nodes bind port 0 first and learn each other's addresses afterwards,
    /// so clusters never race for ports.
    pub async fn start(
        count: usize,
        config: GroupConfig,
        data: Vec<(String, String)>,
    ) -> Result<Self> {
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            let registry = Arc::new(Registry::new());
            let source = MapSource::new(data.clone());
            let group = registry.new_group(TEST_GROUP, config.clone(), source.clone())?;

            let bind_addr = SocketAddr::from(([127, 0, 0, 1], 0));
            let node = CacheNode::start(NodeConfig::new(bind_addr), registry).await?;
            nodes.push(TestNode {
                node,
                group,
                source,
            });
        }

        let addrs: Vec<String> = nodes.iter().map(TestNode::addr).collect();
        for member in &nodes {
            member.node.set_peers(addrs.iter().cloned());
            member.node.attach(&member.group)?;
        }

        Ok(Self { nodes })
    }

    pub fn addrs(&self) -> Vec<String> {
        self.nodes.iter().map(TestNode::addr).collect()
    }

    /// Index of the node owning `key`.
    pub fn owner_of(&self, key: &str) -> Option<usize> {
        let owner = self.nodes.first()?.node.pool().owner(key)?;
        self.nodes.iter().position(|n| n.addr() == owner)
    }

    /// Index of some node that does not own `key`.
    pub fn non_owner_of(&self, key: &str) -> Option<usize> {
        let owner = self.owner_of(key)?;
        (0..self.nodes.len()).find(|i| *i != owner)
    }

    /// Stop and remove one node. Its address stays on the other nodes' rings.
    pub async fn stop_node(&mut self, index: usize) {
        let member = self.nodes.remove(index);
        member.node.shutdown().await;
    }

    pub async fn shutdown(self) {
        for member in self.nodes {
            member.node.shutdown().await;
        }
    }
}
