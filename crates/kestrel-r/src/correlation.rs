use kestrel_engine::protocol::{RemoteReply, ReplyBody};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;

/// Requests that were sent and are still waiting for their reply, by id.
#[derive(Clone, Default)]
pub struct PendingReplies {
    slots: Arc<Mutex<HashMap<String, oneshot::Sender<ReplyBody>>>>,
}

impl PendingReplies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot for `id`. Must happen before the request goes out.
    pub fn register(&self, id: &str) -> oneshot::Receiver<ReplyBody> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.to_string(), tx);
        rx
    }

    /// Deliver a reply to whoever is waiting on its id.
    /// Returns false when nobody is (late, duplicate or unknown id).
    pub fn resolve(&self, reply: RemoteReply) -> bool {
        let slot = self.lock().remove(&reply.id);
        match slot {
            Some(tx) => tx.send(reply.body).is_ok(),
            None => false,
        }
    }

    pub fn cancel(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Drop every slot; waiters observe a closed channel.
    pub fn abandon_all(&self) -> usize {
        let mut slots = self.lock();
        let count = slots.len();
        slots.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, oneshot::Sender<ReplyBody>>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
