//! TCP server answering peer requests.

use crate::error::{Error, NetworkError, Result};
use crate::group::Registry;
use crate::network::rpc::{read_frame, write_frame, ErrorResponse, GetResponse, Message, Status};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Handler for incoming messages.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle an incoming message and optionally return a response.
    async fn handle(&self, msg: Message) -> Option<Message>;
}

/// Serves `Get` requests from the groups of a [`Registry`].
#[derive(Debug, Clone)]
pub struct CacheHandler {
    registry: Arc<Registry>,
}

impl CacheHandler {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    async fn serve(&self, group: &str, key: &str) -> std::result::Result<GetResponse, ErrorResponse> {
        if group.is_empty() || key.is_empty() {
            return Err(ErrorResponse::new(
                Status::BadRequest,
                "group and key are required",
            ));
        }

        let group = self.registry.get_group(group).ok_or_else(|| {
            ErrorResponse::new(Status::NotFound, Error::GroupNotFound(group.to_string()).to_string())
        })?;

        match group.get(key).await {
            Ok(value) => Ok(GetResponse {
                value: value.byte_slice(),
            }),
            Err(e) => Err(ErrorResponse::new(Status::Internal, e.to_string())),
        }
    }
}

#[async_trait]
impl MessageHandler for CacheHandler {
    async fn handle(&self, msg: Message) -> Option<Message> {
        match msg {
            Message::Get(request) => {
                let reply = match self.serve(&request.group, &request.key).await {
                    Ok(response) => Message::Value(response),
                    Err(e) => {
                        debug!(
                            group = %request.group,
                            key = %request.key,
                            status = %e.status,
                            message = %e.message,
                            "Request failed"
                        );
                        Message::Error(e)
                    }
                };
                Some(reply)
            }
            other => Some(Message::Error(ErrorResponse::new(
                Status::BadRequest,
                format!("unexpected message: {:?}", other),
            ))),
        }
    }
}

/// TCP server for peer communication.
pub struct NetworkServer {
    /// Bound listener.
    listener: TcpListener,

    /// Message handler.
    handler: Arc<dyn MessageHandler>,

    /// Shutdown signal receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

impl NetworkServer {
    /// Bind the listener. The returned sender stops the server.
    pub async fn bind(
        bind_addr: SocketAddr,
        handler: Arc<dyn MessageHandler>,
    ) -> Result<(Self, mpsc::Sender<()>)> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| NetworkError::ConnectionFailed {
                addr: bind_addr.to_string(),
                reason: e.to_string(),
            })?;
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let server = Self {
            listener,
            handler,
            shutdown_rx,
        };

        Ok((server, shutdown_tx))
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the server until a shutdown signal arrives or every sender is dropped.
    pub async fn run(mut self) -> Result<()> {
        let addr = self.local_addr()?;
        info!(addr = %addr, "Peer server listening");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "Accepted connection");
                            let handler = self.handler.clone();
                            tokio::spawn(async move {
                                if let Err(e) = Self::handle_connection(stream, handler).await {
                                    debug!(error = %e, "Connection handler error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = self.shutdown_rx.recv() => {
                    info!(addr = %addr, "Peer server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn handle_connection(mut stream: TcpStream, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let _ = stream.set_nodelay(true);
        while let Some(msg) = read_frame(&mut stream).await? {
            if let Some(response) = handler.handle(msg).await {
                write_frame(&mut stream, &response).await?;
            }
        }
        Ok(())
    }
}
