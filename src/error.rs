//! Error types for the cache.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by user supplied data sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the cache.
///
/// The type is `Clone` because a single failed load is handed to every caller
/// that was coalesced onto it.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The requested key was empty.
    #[error("key is required")]
    EmptyKey,

    /// The data source failed; the message is the source's own.
    #[error("{0}")]
    Source(Arc<dyn std::error::Error + Send + Sync>),

    /// A group with this name is already registered.
    #[error("group already exists: {0}")]
    GroupExists(String),

    /// No group with this name is registered.
    #[error("no such group: {0}")]
    GroupNotFound(String),

    /// `register_peer_picker` was called twice on the same group.
    #[error("peer picker already registered for group {0}")]
    PeerPickerAlreadyRegistered(String),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// Network communication errors.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
}

impl Error {
    /// Wrap a data source error.
    pub fn from_source(err: BoxError) -> Self {
        Error::Source(Arc::from(err))
    }
}

/// Network communication errors.
#[derive(Error, Debug, Clone)]
pub enum NetworkError {
    /// Connection failed.
    #[error("connection failed to {addr}: {reason}")]
    ConnectionFailed { addr: String, reason: String },

    /// Connection was closed before a reply arrived.
    #[error("connection closed")]
    ConnectionClosed,

    /// Failed to send message.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Failed to receive message.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(String),

    /// The request did not complete in time.
    #[error("request to {0} timed out")]
    Timeout(String),

    /// The remote peer answered with an error frame.
    #[error("remote returned {status}: {message}")]
    Remote { status: String, message: String },
}

impl From<io::Error> for NetworkError {
    fn from(e: io::Error) -> Self {
        NetworkError::Io(e.to_string())
    }
}

impl From<bincode::Error> for NetworkError {
    fn from(e: bincode::Error) -> Self {
        NetworkError::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Network(e.into())
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Network(e.into())
    }
}
