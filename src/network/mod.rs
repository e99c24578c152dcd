//! Network communication layer.

pub mod client;
pub mod rpc;
pub mod server;

pub use client::PeerClient;
pub use rpc::{ErrorResponse, GetRequest, GetResponse, Message, Status};
pub use server::{CacheHandler, MessageHandler, NetworkServer};
