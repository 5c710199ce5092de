/// Failures raised while carrying a command to the remote surface and back.
///
/// Every variant names the command it belongs to so that the error shown to
/// the caller says which step failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("cannot send {command}: no browser extension is connected")]
    ChannelUnavailable { command: String },

    #[error("{command} timed out after {timeout_ms}ms without a reply")]
    ChannelTimeout { command: String, timeout_ms: u64 },

    #[error("{command} failed on the remote surface: {message}")]
    RemoteFault {
        command: String,
        code: Option<String>,
        message: String,
    },

    #[error("{command} returned a reply that could not be decoded: {message}")]
    MalformedReply { command: String, message: String },

    #[error("connection lost while waiting for {command}")]
    ConnectionLost { command: String },
}

impl DispatchError {
    /// Stable code for logs and error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::ChannelUnavailable { .. } => "CHANNEL_UNAVAILABLE",
            DispatchError::ChannelTimeout { .. } => "CHANNEL_TIMEOUT",
            DispatchError::RemoteFault { .. } => "REMOTE_FAULT",
            DispatchError::MalformedReply { .. } => "MALFORMED_REPLY",
            DispatchError::ConnectionLost { .. } => "CONNECTION_LOST",
        }
    }

    pub fn command(&self) -> &str {
        match self {
            DispatchError::ChannelUnavailable { command }
            | DispatchError::ChannelTimeout { command, .. }
            | DispatchError::RemoteFault { command, .. }
            | DispatchError::MalformedReply { command, .. }
            | DispatchError::ConnectionLost { command } => command,
        }
    }
}
