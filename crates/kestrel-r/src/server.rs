use crate::correlation::PendingReplies;
use futures::{SinkExt, StreamExt};
use kestrel_engine::protocol::{RemoteReply, RemoteRequest};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// WebSocket endpoint the browser extension connects to.
pub struct RemoteServer {
    addr: SocketAddr,
    // One sender, one subscriber per live connection (usually exactly one).
    command_tx: broadcast::Sender<RemoteRequest>,
}

#[derive(Clone)]
pub struct ServerHandle {
    pub command_tx: broadcast::Sender<RemoteRequest>,
    pub pending: PendingReplies,
    /// Actual bound address; differs from the requested one when port 0 was used.
    pub local_addr: SocketAddr,
}

impl ServerHandle {
    /// Number of extension connections that completed the WebSocket handshake.
    pub fn connections(&self) -> usize {
        self.command_tx.receiver_count()
    }
}

impl RemoteServer {
    pub fn new(addr: SocketAddr) -> Self {
        let (command_tx, _) = broadcast::channel(100);
        Self { addr, command_tx }
    }

    pub async fn start(&self) -> Result<ServerHandle, ServerError> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| ServerError::Bind {
            addr: self.addr,
            source,
        })?;
        info!("Remote server listening on: {}", local_addr);

        let pending = PendingReplies::new();
        let command_tx = self.command_tx.clone();

        let server_cmd_tx = command_tx.clone();
        let server_pending = pending.clone();

        tokio::spawn(async move {
            debug!("Server accept loop started");
            while let Ok((stream, peer)) = listener.accept().await {
                info!("Accepted TCP connection from: {}", peer);
                tokio::spawn(accept_connection(
                    stream,
                    server_cmd_tx.clone(),
                    server_pending.clone(),
                ));
            }
        });

        Ok(ServerHandle {
            command_tx,
            pending,
            local_addr,
        })
    }
}

async fn accept_connection(
    stream: TcpStream,
    command_tx: broadcast::Sender<RemoteRequest>,
    pending: PendingReplies,
) {
    // Counted as attached only after a valid upgrade request, and before the
    // handshake response reaches the client.
    let mut subscription = None;
    let handshake = accept_hdr_async(
        stream,
        |_request: &Request, response: Response| -> Result<Response, ErrorResponse> {
            subscription = Some(command_tx.subscribe());
            Ok(response)
        },
    )
    .await;

    let (ws_stream, mut cmd_rx) = match (handshake, subscription) {
        (Ok(ws), Some(cmd_rx)) => (ws, cmd_rx),
        (Ok(_), None) => {
            error!("WebSocket handshake completed without an upgrade request");
            release_connection(&command_tx, &pending);
            return;
        }
        (Err(e), subscription) => {
            error!("Error during the websocket handshake occurred: {}", e);
            drop(subscription);
            release_connection(&command_tx, &pending);
            return;
        }
    };

    info!("New WebSocket connection: established");
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    loop {
        tokio::select! {
            // Command from a dispatcher -> extension
            cmd = cmd_rx.recv() => match cmd {
                Ok(request) => {
                    let json = match serde_json::to_string(&request) {
                        Ok(json) => json,
                        Err(e) => {
                            error!(id = %request.id, "Failed to encode request: {}", e);
                            continue;
                        }
                    };
                    debug!(id = %request.id, action = request.command.name(), "Sending request");
                    if let Err(e) = ws_sender.send(Message::Text(json)).await {
                        error!("Failed to send message to WS: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Connection fell behind; requests dropped");
                }
                Err(RecvError::Closed) => break,
            },

            // Reply from extension -> waiting dispatcher
            msg = ws_receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<RemoteReply>(&text) {
                        Ok(reply) => {
                            let id = reply.id.clone();
                            if !pending.resolve(reply) {
                                debug!(id = %id, "Reply matched no pending request");
                            }
                        }
                        Err(e) => {
                            error!("Failed to parse reply from extension: {} | Text: {}", e, text);
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("WebSocket closed");
                    break;
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            }
        }
    }

    drop(cmd_rx);
    release_connection(&command_tx, &pending);
}

/// Fail every waiting request once no extension connection is left.
fn release_connection(command_tx: &broadcast::Sender<RemoteRequest>, pending: &PendingReplies) {
    if command_tx.receiver_count() == 0 {
        let abandoned = pending.abandon_all();
        if abandoned > 0 {
            warn!(abandoned, "Last extension disconnected with requests in flight");
        }
    }
}
