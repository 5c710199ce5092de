use async_trait::async_trait;
use kestrel_engine::DispatchError;
use kestrel_engine::dispatcher::Dispatcher;
use kestrel_engine::protocol::RemoteCommand;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Dispatcher that answers each command name with a canned reply.
#[derive(Default)]
pub struct ScriptedDispatcher {
    replies: Mutex<HashMap<&'static str, Result<Value, DispatchError>>>,
    sent: Mutex<Vec<RemoteCommand>>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, command: &'static str, data: Value) -> Self {
        self.replies.lock().unwrap().insert(command, Ok(data));
        self
    }

    pub fn fail(self, command: &'static str, error: DispatchError) -> Self {
        self.replies.lock().unwrap().insert(command, Err(error));
        self
    }

    pub fn sent(&self) -> Vec<RemoteCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_names(&self) -> Vec<&'static str> {
        self.sent().iter().map(RemoteCommand::name).collect()
    }
}

#[async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn send(&self, command: RemoteCommand) -> Result<Value, DispatchError> {
        let name = command.name();
        self.sent.lock().unwrap().push(command);
        self.replies
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_else(|| {
                Err(DispatchError::ChannelUnavailable {
                    command: name.to_string(),
                })
            })
    }
}

pub fn remote_fault(command: &str, message: &str) -> DispatchError {
    DispatchError::RemoteFault {
        command: command.to_string(),
        code: None,
        message: message.to_string(),
    }
}
