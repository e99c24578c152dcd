//! Peer selection and remote fetch.
//!
//! A [`Group`](crate::group::Group) does not know about the network. It asks
//! a [`PeerPicker`] which peer owns a key and, when that peer is not the local
//! process, fetches the value through the returned [`PeerGetter`].
//!
//! [`PeerPool`] is the TCP-backed implementation: a consistent hash ring of
//! peer addresses plus one [`PeerClient`](crate::network::PeerClient) per
//! remote peer.

mod pool;

pub use pool::PeerPool;

use crate::error::Result;
use crate::network::rpc::{GetRequest, GetResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Fetches a value of a group from one remote peer.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Ask the peer for `request.key` of `request.group`.
    ///
    /// Any error means the peer did not provide a value; the caller falls
    /// back to its own data source.
    async fn get(&self, request: &GetRequest) -> Result<GetResponse>;
}

/// Chooses the peer owning a key.
pub trait PeerPicker: Send + Sync {
    /// Return the getter for the owner of `key`, or `None` when the key
    /// belongs to the local process or no peers are known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}
