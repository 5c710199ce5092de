use crate::server::ServerHandle;
use async_trait::async_trait;
use kestrel_engine::DispatchError;
use kestrel_engine::dispatcher::Dispatcher;
use kestrel_engine::protocol::{RemoteCommand, RemoteRequest, ReplyBody};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CONNECT_POLL: Duration = Duration::from_millis(50);

/// [`Dispatcher`] backed by the WebSocket server.
///
/// Every request carries a fresh id; the reply with the same id completes it.
/// A request with no reply inside `reply_timeout` fails with
/// [`DispatchError::ChannelTimeout`] and its slot is released.
pub struct RemoteChannel {
    handle: ServerHandle,
    reply_timeout: Duration,
    connect_grace: Duration,
}

impl RemoteChannel {
    pub fn new(handle: ServerHandle, reply_timeout: Duration) -> Self {
        Self {
            handle,
            reply_timeout,
            connect_grace: Duration::ZERO,
        }
    }

    /// Let commands wait up to `grace` for an extension to connect.
    pub fn with_connect_grace(mut self, grace: Duration) -> Self {
        self.connect_grace = grace;
        self
    }

    async fn wait_for_connection(&self, command: &str) -> Result<(), DispatchError> {
        if self.handle.connections() > 0 {
            return Ok(());
        }

        if !self.connect_grace.is_zero() {
            info!("Waiting for browser extension to connect...");
            let deadline = Instant::now() + self.connect_grace;
            while Instant::now() < deadline {
                tokio::time::sleep(CONNECT_POLL).await;
                if self.handle.connections() > 0 {
                    info!("Extension connected.");
                    return Ok(());
                }
            }
        }

        Err(DispatchError::ChannelUnavailable {
            command: command.to_string(),
        })
    }
}

#[async_trait]
impl Dispatcher for RemoteChannel {
    async fn send(&self, command: RemoteCommand) -> Result<serde_json::Value, DispatchError> {
        let name = command.name();
        self.wait_for_connection(name).await?;

        let id = Uuid::new_v4().to_string();
        let reply_rx = self.handle.pending.register(&id);

        if self
            .handle
            .command_tx
            .send(RemoteRequest {
                id: id.clone(),
                command,
            })
            .is_err()
        {
            self.handle.pending.cancel(&id);
            return Err(DispatchError::ChannelUnavailable {
                command: name.to_string(),
            });
        }
        debug!(id = %id, command = name, "Request sent");

        match tokio::time::timeout(self.reply_timeout, reply_rx).await {
            Ok(Ok(ReplyBody::Ok { data, warnings })) => {
                for warning in warnings {
                    warn!(command = name, "Remote warning: {}", warning);
                }
                Ok(data)
            }
            Ok(Ok(ReplyBody::Error {
                code,
                message,
                hint,
            })) => {
                let message = match hint {
                    Some(hint) => format!("{} (hint: {})", message, hint),
                    None => message,
                };
                Err(DispatchError::RemoteFault {
                    command: name.to_string(),
                    code,
                    message,
                })
            }
            Ok(Err(_)) => Err(DispatchError::ConnectionLost {
                command: name.to_string(),
            }),
            Err(_) => {
                self.handle.pending.cancel(&id);
                warn!(id = %id, command = name, "Timed out waiting for reply");
                Err(DispatchError::ChannelTimeout {
                    command: name.to_string(),
                    timeout_ms: self.reply_timeout.as_millis() as u64,
                })
            }
        }
    }
}
