use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Mutex as SessionLock;
use tracing::debug;

use super::controller::Controller;
use super::event::{Command, InputContent, InputEvent, Output, Reply};
use super::state::{Session, SessionState};
use super::UserId;

type Slot = Arc<SessionLock<Option<Session>>>;

/// Routes inbound messages to per-user sessions.
///
/// Each user has one slot guarded by its own async lock, so messages from
/// the same user are handled strictly one at a time while different users
/// proceed independently. A slot exists only while its user has a live
/// session or a message in flight.
pub struct Reactor {
    controller: Controller,
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl Reactor {
    pub fn new(controller: Controller) -> Self {
        Self {
            controller,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of a user's session, `None` when idle.
    pub async fn state_of(&self, user: UserId) -> Option<SessionState> {
        let slot = self.existing(user)?;
        let guard = slot.lock().await;
        guard.as_ref().map(|s| s.state)
    }

    /// Clone of a user's live session, for inspection.
    pub async fn session_of(&self, user: UserId) -> Option<Session> {
        let slot = self.existing(user)?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Number of users currently holding a slot.
    pub fn tracked_users(&self) -> usize {
        self.lock_slots().len()
    }

    /// Processes one inbound message and returns everything to send back.
    pub async fn handle(&self, input: InputEvent) -> Vec<Output> {
        let chat_id = input.chat_id;
        let user = &input.from;
        let slot = self.slot(input.user_id());
        let mut guard = slot.lock().await;

        let replies: Vec<Reply> = match &input.content {
            InputContent::Command(Command::Start) => {
                let (session, replies) = self.controller.start(user).await;
                *guard = Some(session);
                replies
            }
            InputContent::Command(Command::Help) => vec![self.controller.help(user).await],
            InputContent::Command(Command::MyId) => vec![self.controller.my_id(user).await],
            InputContent::Command(Command::Cancel) => {
                *guard = None;
                vec![self.controller.cancel()]
            }
            InputContent::Command(Command::Finish) => match guard.as_mut() {
                Some(session) if session.state == SessionState::AiChat => {
                    self.controller.finish(session)
                }
                _ => {
                    debug!(user_id = user.id, "/finish outside assistant mode ignored");
                    Vec::new()
                }
            },
            InputContent::Command(Command::Unknown(name)) => {
                debug!(user_id = user.id, "unknown command /{} ignored", name);
                Vec::new()
            }
            InputContent::Text(text) => match guard.as_mut() {
                Some(session) => self.controller.advance(session, user, text).await,
                None => {
                    debug!(user_id = user.id, "text without an active session ignored");
                    Vec::new()
                }
            },
        };

        match guard.as_ref() {
            Some(session) if session.is_closed() => {
                debug!(session_id = %session.id, version = session.version, "session closed");
                *guard = None;
            }
            Some(session) => {
                debug!(
                    session_id = %session.id,
                    version = session.version,
                    state = ?session.state,
                    "session advanced"
                );
            }
            None => {}
        }
        drop(guard);
        self.release(input.user_id(), slot);

        replies.into_iter().map(|r| r.to(chat_id)).collect()
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Slot>> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn slot(&self, user: UserId) -> Slot {
        self.lock_slots().entry(user).or_default().clone()
    }

    fn existing(&self, user: UserId) -> Option<Slot> {
        self.lock_slots().get(&user).cloned()
    }

    /// Drops an idle slot once nobody else holds it. Clones are only handed
    /// out under the map lock, so the count checked here cannot grow behind it.
    fn release(&self, user: UserId, slot: Slot) {
        let mut slots = self.lock_slots();
        let mapped = slots.get(&user).is_some_and(|s| Arc::ptr_eq(s, &slot));
        // One reference in the map, one here
        if !mapped || Arc::strong_count(&slot) != 2 {
            return;
        }
        let idle = slot.try_lock().map(|s| s.is_none()).unwrap_or(false);
        if idle {
            slots.remove(&user);
        }
    }
}
