//! RPC message types for peer communication.
//!
//! Every message is a `bincode` encoded [`Message`] preceded by its length as
//! a 4-byte big-endian integer.

use crate::error::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted from the wire.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Network message wrapper for all communication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Message {
    /// Ask a peer for a key of a group.
    Get(GetRequest),

    /// Successful answer to a `Get`.
    Value(GetResponse),

    /// Failed answer to a `Get`.
    Error(ErrorResponse),
}

/// Request for one key of a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetRequest {
    pub group: String,
    pub key: String,
}

impl GetRequest {
    pub fn new(group: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            key: key.into(),
        }
    }
}

/// The raw bytes of a cached value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetResponse {
    pub value: Vec<u8>,
}

/// Class of a failed request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Status {
    /// Empty group or key.
    BadRequest,
    /// Unknown group.
    NotFound,
    /// The group failed to produce the value.
    Internal,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::BadRequest => f.write_str("bad request"),
            Status::NotFound => f.write_str("not found"),
            Status::Internal => f.write_str("internal error"),
        }
    }
}

/// Error reply carrying a status and a human readable message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub status: Status,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl From<ErrorResponse> for NetworkError {
    fn from(e: ErrorResponse) -> Self {
        NetworkError::Remote {
            status: e.status.to_string(),
            message: e.message,
        }
    }
}

/// Encode a message to bytes.
pub fn encode_message(msg: &Message) -> std::result::Result<Vec<u8>, bincode::Error> {
    bincode::serialize(msg)
}

/// Decode a message from bytes.
pub fn decode_message(data: &[u8]) -> std::result::Result<Message, bincode::Error> {
    bincode::deserialize(data)
}

/// Frame a message with length prefix for TCP transmission. Messages whose
/// encoding exceeds [`MAX_FRAME_LEN`] are refused.
pub fn frame_message(msg: &Message) -> Result<Vec<u8>> {
    let data = encode_message(msg)?;
    if data.len() > MAX_FRAME_LEN {
        return Err(NetworkError::SendFailed(format!("message too large: {} bytes", data.len())).into());
    }
    let len = data.len() as u32;

    let mut framed = Vec::with_capacity(4 + data.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(&data);

    Ok(framed)
}

/// Write one framed message.
pub async fn write_frame<W>(writer: &mut W, msg: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = frame_message(msg)?;
    writer
        .write_all(&framed)
        .await
        .map_err(|e| NetworkError::SendFailed(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| NetworkError::SendFailed(e.to_string()))?;
    Ok(())
}

/// Read one framed message. Returns `None` if the stream ended cleanly
/// before a new frame started.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(NetworkError::from(e).into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetworkError::ReceiveFailed(format!("message too large: {} bytes", len)).into());
    }

    let mut data = vec![0u8; len];
    reader
        .read_exact(&mut data)
        .await
        .map_err(|e| NetworkError::ReceiveFailed(e.to_string()))?;

    let msg = decode_message(&data).map_err(|e| NetworkError::Deserialization(e.to_string()))?;
    Ok(Some(msg))
}
