//! TCP client fetching values from a remote peer.

use crate::cluster::PeerGetter;
use crate::config::TransportConfig;
use crate::error::{NetworkError, Result};
use crate::network::rpc::{read_frame, write_frame, GetRequest, GetResponse, Message};
use crate::types::PeerId;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Client for one remote peer. Every request uses a fresh connection.
#[derive(Debug, Clone)]
pub struct PeerClient {
    addr: PeerId,
    config: TransportConfig,
}

impl PeerClient {
    pub fn new(addr: impl Into<PeerId>, config: TransportConfig) -> Self {
        Self {
            addr: addr.into(),
            config,
        }
    }

    /// Address of the remote peer.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self) -> Result<TcpStream> {
        let stream = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&*self.addr))
            .await
            .map_err(|_| NetworkError::ConnectionFailed {
                addr: self.addr.clone(),
                reason: "connection timeout".to_string(),
            })?
            .map_err(|e| NetworkError::ConnectionFailed {
                addr: self.addr.clone(),
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);
        Ok(stream)
    }

    async fn exchange(&self, request: &GetRequest) -> Result<GetResponse> {
        let mut stream = self.connect().await?;
        write_frame(&mut stream, &Message::Get(request.clone())).await?;

        let reply = read_frame(&mut stream).await?;
        let _ = stream.shutdown().await;

        match reply {
            Some(Message::Value(response)) => Ok(response),
            Some(Message::Error(e)) => Err(NetworkError::from(e).into()),
            Some(other) => Err(NetworkError::Remote {
                status: "unexpected reply".to_string(),
                message: format!("{:?}", other),
            }
            .into()),
            None => Err(NetworkError::ConnectionClosed.into()),
        }
    }
}

#[async_trait]
impl PeerGetter for PeerClient {
    async fn get(&self, request: &GetRequest) -> Result<GetResponse> {
        debug!(peer = %self.addr, group = %request.group, key = %request.key, "Fetching from peer");
        tokio::time::timeout(self.config.request_timeout, self.exchange(request))
            .await
            .map_err(|_| NetworkError::Timeout(self.addr.clone()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::network::rpc::{ErrorResponse, Status};
    use std::time::Duration;
    use tokio::net::TcpListener;

    async fn serve_once(reply: Message) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_frame(&mut stream).await.unwrap();
            assert!(matches!(request, Some(Message::Get(_))));
            write_frame(&mut stream, &reply).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn test_value_reply() {
        let addr = serve_once(Message::Value(GetResponse {
            value: b"630".to_vec(),
        }))
        .await;

        let client = PeerClient::new(addr, TransportConfig::default());
        let response = client.get(&GetRequest::new("scores", "Tom")).await.unwrap();
        assert_eq!(response.value, b"630");
    }

    #[tokio::test]
    async fn test_error_reply_maps_to_remote() {
        let addr = serve_once(Message::Error(ErrorResponse::new(
            Status::NotFound,
            "no such group: scores",
        )))
        .await;

        let client = PeerClient::new(addr, TransportConfig::default());
        let err = client.get(&GetRequest::new("scores", "Tom")).await.unwrap_err();
        match err {
            Error::Network(NetworkError::Remote { status, message }) => {
                assert_eq!(status, "not found");
                assert_eq!(message, "no such group: scores");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let client = PeerClient::new(addr, TransportConfig::default());
        let err = client.get(&GetRequest::new("scores", "Tom")).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Network(NetworkError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let config = TransportConfig {
            connect_timeout: Duration::from_secs(1),
            request_timeout: Duration::from_millis(100),
        };
        let client = PeerClient::new(addr, config);
        let err = client.get(&GetRequest::new("scores", "Tom")).await.unwrap_err();
        assert!(matches!(err, Error::Network(NetworkError::Timeout(_))));
    }
}
