use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::event::InputEvent;
use super::notifier::Messenger;
use super::reactor::Reactor;
use super::UserId;

/// Feeds inbound messages to the reactor in arrival order per user.
///
/// Every user with pending input gets one queue and one task draining it,
/// so a user's messages and replies never overtake each other while
/// different users run in parallel. The queue is torn down once empty.
pub struct Dispatcher {
    reactor: Arc<Reactor>,
    messenger: Arc<dyn Messenger>,
    queues: Mutex<HashMap<UserId, UnboundedSender<InputEvent>>>,
}

impl Dispatcher {
    pub fn new(reactor: Arc<Reactor>, messenger: Arc<dyn Messenger>) -> Arc<Self> {
        Arc::new(Self {
            reactor,
            messenger,
            queues: Mutex::new(HashMap::new()),
        })
    }

    /// Number of users with a live queue.
    pub fn pending_users(&self) -> usize {
        self.lock_queues().len()
    }

    /// Queues `input` behind the user's earlier messages. Returns the handle
    /// of a newly started drain task, or `None` when one is already running.
    pub fn submit(self: &Arc<Self>, input: InputEvent) -> Option<JoinHandle<()>> {
        let user = input.user_id();
        let mut queues = self.lock_queues();

        let input = match queues.get(&user) {
            Some(tx) => match tx.send(input) {
                Ok(()) => return None,
                Err(mpsc::error::SendError(input)) => input,
            },
            None => input,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // Receiver is alive, cannot fail
        let _ = tx.send(input);
        queues.insert(user, tx);
        debug!(user_id = user, "started message queue");
        Some(tokio::spawn(self.clone().drain(user, rx)))
    }

    async fn drain(self: Arc<Self>, user: UserId, mut rx: UnboundedReceiver<InputEvent>) {
        loop {
            let input = match rx.try_recv() {
                Ok(input) => input,
                Err(_) => {
                    // Re-check under the map lock: `submit` only sends while holding it
                    let mut queues = self.lock_queues();
                    match rx.try_recv() {
                        Ok(input) => input,
                        Err(_) => {
                            queues.remove(&user);
                            debug!(user_id = user, "message queue drained");
                            return;
                        }
                    }
                }
            };

            for output in self.reactor.handle(input).await {
                if let Err(e) = self.messenger.send(&output).await {
                    warn!(chat_id = output.chat_id, "failed to send reply: {}", e);
                }
            }
        }
    }

    fn lock_queues(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, UnboundedSender<InputEvent>>> {
        self.queues.lock().unwrap_or_else(|p| p.into_inner())
    }
}
