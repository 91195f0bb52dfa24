#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use komissar::kernel::event::{InputEvent, Output};
use komissar::kernel::history::Turn;
use komissar::kernel::notifier::{DeliveryError, Messenger, Notifier};
use komissar::kernel::registry::RecipientRegistry;
use komissar::kernel::report::Submitter;
use komissar::kernel::UserId;
use komissar::services::llm::{Assistant, AssistantAdapter, AssistantError};
use komissar::{Controller, Dispatcher, Reactor};

/// Records every message; chats listed in `failing` reject delivery and
/// chats listed in `hanging` never answer.
#[derive(Default)]
pub struct FakeMessenger {
    pub sent: Mutex<Vec<Output>>,
    pub failing: HashSet<i64>,
    pub hanging: HashSet<i64>,
}

impl FakeMessenger {
    pub fn failing_for(chats: &[i64]) -> Self {
        Self { failing: chats.iter().copied().collect(), ..Self::default() }
    }

    pub fn hanging_for(chats: &[i64]) -> Self {
        Self { hanging: chats.iter().copied().collect(), ..Self::default() }
    }

    /// Texts sent to one chat, in order.
    pub fn texts_for(&self, chat_id: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|o| o.chat_id == chat_id)
            .map(|o| o.text)
            .collect()
    }

    pub fn sent(&self) -> Vec<Output> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for FakeMessenger {
    async fn send(&self, message: &Output) -> Result<(), DeliveryError> {
        if self.hanging.contains(&message.chat_id) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        self.sent.lock().unwrap().push(message.clone());
        if self.failing.contains(&message.chat_id) {
            return Err(DeliveryError::Api("Forbidden: bot was blocked by the user".into()));
        }
        Ok(())
    }
}

/// What a `FakeAssistant` was called with.
#[derive(Debug, Clone)]
pub struct Call {
    pub instruction: String,
    pub history: Vec<Turn>,
    pub latest: String,
}

pub enum Script {
    Reply(&'static str),
    Fail,
    Hang,
}

pub struct FakeAssistant {
    pub script: Script,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeAssistant {
    pub fn new(script: Script) -> Self {
        Self { script, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Assistant for FakeAssistant {
    async fn complete(
        &self,
        instruction: &str,
        history: &[Turn],
        latest: &str,
    ) -> Result<String, AssistantError> {
        self.calls.lock().unwrap().push(Call {
            instruction: instruction.to_string(),
            history: history.to_vec(),
            latest: latest.to_string(),
        });
        match self.script {
            Script::Reply(text) => Ok(text.to_string()),
            Script::Fail => Err(AssistantError::Api("500 Internal Server Error".into())),
            Script::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

pub fn user(id: UserId) -> Submitter {
    Submitter { id, first_name: "Иван".into(), username: Some("ivan".into()) }
}

pub fn text(from: UserId, body: &str) -> InputEvent {
    InputEvent::from_text(from, user(from), body)
}

/// Registry file pre-filled with `ids`, inside `dir`.
pub fn registry_with(dir: &Path, ids: &[UserId]) -> Arc<RecipientRegistry> {
    let path = dir.join("admins.txt");
    let content: String = ids.iter().map(|id| format!("{}\n", id)).collect();
    std::fs::write(&path, content).unwrap();
    Arc::new(RecipientRegistry::new(path, Vec::new()))
}

pub struct Harness {
    pub reactor: Arc<Reactor>,
    pub messenger: Arc<FakeMessenger>,
    pub registry: Arc<RecipientRegistry>,
}

impl Harness {
    pub fn new(registry: Arc<RecipientRegistry>, assistant: AssistantAdapter) -> Self {
        Self::with_messenger(registry, assistant, Arc::new(FakeMessenger::default()))
    }

    pub fn with_messenger(
        registry: Arc<RecipientRegistry>,
        assistant: AssistantAdapter,
        messenger: Arc<FakeMessenger>,
    ) -> Self {
        let notifier = Notifier::new(messenger.clone(), Duration::from_secs(1));
        let controller = Controller::new(registry.clone(), assistant, notifier);
        Self { reactor: Arc::new(Reactor::new(controller)), messenger, registry }
    }

    /// Dispatcher that delivers replies through the harness messenger.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Dispatcher::new(self.reactor.clone(), self.messenger.clone())
    }

    /// Sends `body` as `from` and returns the reply texts.
    pub async fn say(&self, from: UserId, body: &str) -> Vec<String> {
        self.reactor
            .handle(text(from, body))
            .await
            .into_iter()
            .map(|o| o.text)
            .collect()
    }
}
