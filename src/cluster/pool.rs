//! TCP-backed peer picker.

use crate::cluster::{PeerGetter, PeerPicker};
use crate::config::TransportConfig;
use crate::network::PeerClient;
use crate::partitioning::HashRing;
use crate::types::PeerId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Ring and clients, replaced together by `set_peers`.
#[derive(Debug)]
struct PoolState {
    ring: HashRing,
    clients: HashMap<PeerId, Arc<PeerClient>>,
}

/// Picks peers from a consistent hash ring of addresses and talks to them
/// over TCP.
///
/// The pool knows its own address so that keys owned by the local process
/// are served locally instead of looping through the network.
#[derive(Debug)]
pub struct PeerPool {
    /// Address of the local process as it appears in the peer list.
    self_addr: PeerId,

    /// Virtual nodes per peer.
    replicas: usize,

    /// Settings for the per-peer clients.
    transport: TransportConfig,

    state: RwLock<PoolState>,
}

impl PeerPool {
    /// Create an empty pool for the process reachable at `self_addr`.
    pub fn new(self_addr: impl Into<PeerId>, replicas: usize) -> Self {
        Self {
            self_addr: self_addr.into(),
            replicas,
            transport: TransportConfig::default(),
            state: RwLock::new(PoolState {
                ring: HashRing::new(replicas),
                clients: HashMap::new(),
            }),
        }
    }

    /// Use custom client settings for peers added afterwards.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn self_addr(&self) -> &str {
        &self.self_addr
    }

    /// Replace the peer set. `peers` should include the local address.
    pub fn set_peers<I, S>(&self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<PeerId>,
    {
        let peers: Vec<PeerId> = peers.into_iter().map(Into::into).collect();

        let mut ring = HashRing::new(self.replicas);
        ring.add(peers.iter().cloned());

        let clients = peers
            .iter()
            .filter(|peer| **peer != self.self_addr)
            .map(|peer| {
                let client = PeerClient::new(peer.clone(), self.transport.clone());
                (peer.clone(), Arc::new(client))
            })
            .collect();

        info!(
            self_addr = %self.self_addr,
            peers = ring.len(),
            "Peer set updated"
        );
        *self.state.write() = PoolState { ring, clients };
    }

    /// Peers currently on the ring, sorted.
    pub fn peers(&self) -> Vec<PeerId> {
        self.state.read().ring.peers().to_vec()
    }

    /// Address owning `key`, the local address included.
    pub fn owner(&self, key: &str) -> Option<PeerId> {
        self.state.read().ring.get(key).cloned()
    }

    /// How many of `sample_size` synthetic keys each peer owns.
    pub fn distribution(&self, sample_size: usize) -> HashMap<PeerId, usize> {
        self.state.read().ring.get_distribution(sample_size)
    }
}

impl PeerPicker for PeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        let owner = state.ring.get(key)?;
        if *owner == self.self_addr {
            return None;
        }

        debug!(key, peer = %owner, "Picked peer");
        state
            .clients
            .get(owner)
            .map(|client| client.clone() as Arc<dyn PeerGetter>)
    }
}
