//! A cache process: peer server plus peer pool.

use crate::cluster::PeerPool;
use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::group::{Group, Registry};
use crate::network::{CacheHandler, NetworkServer};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Runs the peer server of one process and routes its groups' misses to
/// the other peers.
///
/// ```rust,no_run
/// use macchiato::{CacheNode, GroupConfig, NodeConfig, Registry};
/// use macchiato::group::GetterFn;
/// use std::sync::Arc;
///
/// # async fn run() -> macchiato::Result<()> {
/// let registry = Arc::new(Registry::new());
/// let group = registry.new_group(
///     "scores",
///     GroupConfig::default(),
///     GetterFn::new(|key: &str| Ok(key.as_bytes().to_vec())),
/// )?;
///
/// let config = NodeConfig::new("127.0.0.1:8001".parse().unwrap())
///     .with_peers(["127.0.0.1:8001", "127.0.0.1:8002", "127.0.0.1:8003"]);
/// let node = CacheNode::start(config, registry).await?;
/// node.attach(&group)?;
///
/// let value = group.get("Tom").await?;
/// # let _ = value;
/// node.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct CacheNode {
    addr: SocketAddr,
    pool: Arc<PeerPool>,
    registry: Arc<Registry>,
    shutdown_tx: mpsc::Sender<()>,
    server: JoinHandle<Result<()>>,
}

impl CacheNode {
    /// Bind the peer server and build the peer pool.
    ///
    /// The node's ring identity is `advertise_addr` when set, otherwise the
    /// bound address (see [`local_identity`]). With port 0 the peer list has
    /// to be set afterwards with [`CacheNode::set_peers`].
    pub async fn start(config: NodeConfig, registry: Arc<Registry>) -> Result<Self> {
        let handler = Arc::new(CacheHandler::new(registry.clone()));
        let (server, shutdown_tx) = NetworkServer::bind(config.bind_addr, handler).await?;
        let addr = server.local_addr()?;

        let identity = match config.advertise_addr {
            Some(advertised) => advertised,
            None => {
                if addr.ip().is_unspecified() {
                    warn!(addr = %addr, "Bound to a wildcard address without advertise_addr, assuming loopback");
                }
                local_identity(addr)
            }
        };

        let pool = Arc::new(
            PeerPool::new(identity, config.replicas).with_transport(config.transport),
        );
        if !config.peers.is_empty() {
            pool.set_peers(config.peers);
        }

        let server = tokio::spawn(server.run());
        info!(addr = %addr, identity = pool.self_addr(), "Cache node started");

        Ok(Self {
            addr,
            pool,
            registry,
            shutdown_tx,
            server,
        })
    }

    /// Address the peer server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// This node's identity on the ring.
    pub fn identity(&self) -> &str {
        self.pool.self_addr()
    }

    pub fn pool(&self) -> &Arc<PeerPool> {
        &self.pool
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Replace the cluster's peer set. Must include this node's address.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pool.set_peers(peers);
    }

    /// Route misses of `group` through this node's peer pool.
    pub fn attach(&self, group: &Group) -> Result<()> {
        group.register_peer_picker(self.pool.clone())
    }

    /// Attach every group of the node's registry.
    pub fn attach_all(&self) -> Result<()> {
        for name in self.registry.group_names() {
            let group = self
                .registry
                .get_group(&name)
                .ok_or_else(|| Error::GroupNotFound(name.clone()))?;
            self.attach(&group)?;
        }
        Ok(())
    }

    /// Stop the peer server and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(addr = %self.addr, error = %e, "Peer server failed"),
            Err(e) => warn!(addr = %self.addr, error = %e, "Peer server task failed"),
        }
        info!(addr = %self.addr, "Cache node stopped");
    }
}

/// Ring identity derived from a bound address. A wildcard IP cannot appear
/// in a peer list, so it is replaced by the loopback address of its family.
pub fn local_identity(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port()).to_string()
}

impl std::fmt::Debug for CacheNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheNode")
            .field("addr", &self.addr)
            .field("identity", &self.identity())
            .field("peers", &self.pool.peers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_identity() {
        let addr: SocketAddr = "127.0.0.1:8001".parse().unwrap();
        assert_eq!(local_identity(addr), "127.0.0.1:8001");

        let addr: SocketAddr = "0.0.0.0:8001".parse().unwrap();
        assert_eq!(local_identity(addr), "127.0.0.1:8001");

        let addr: SocketAddr = "[::]:8001".parse().unwrap();
        assert_eq!(local_identity(addr), "[::1]:8001");

        let addr: SocketAddr = "10.0.0.7:8001".parse().unwrap();
        assert_eq!(local_identity(addr), "10.0.0.7:8001");
    }
}
