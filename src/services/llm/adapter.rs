use std::sync::Arc;
use std::time::Duration;

use tracing::{error, warn};

use super::{prompt, Assistant, AssistantError};
use crate::kernel::history::{Turn, ASSISTANT_WINDOW};
use crate::kernel::report::Report;

pub const UNAVAILABLE_REPLY: &str = "Извините, AI-помощник временно недоступен. \
     Пожалуйста, используйте режим с кнопками или попробуйте позже.";

pub const FAILURE_REPLY: &str = "Извините, произошла ошибка при обработке сообщения. \
     Попробуйте ещё раз или используйте режим с кнопками (/start).";

/// Wraps an optional `Assistant` so callers always get a printable reply.
#[derive(Clone)]
pub struct AssistantAdapter {
    assistant: Option<Arc<dyn Assistant>>,
    timeout: Duration,
}

impl AssistantAdapter {
    pub fn new(assistant: Arc<dyn Assistant>, timeout: Duration) -> Self {
        Self { assistant: Some(assistant), timeout }
    }

    /// No backing service; every reply is the "unavailable" apology.
    pub fn disabled() -> Self {
        Self { assistant: None, timeout: Duration::ZERO }
    }

    /// Reply to `latest` given the prior turns. Never fails.
    pub async fn reply(&self, latest: &str, history: &[Turn], report: &Report) -> String {
        match self.try_reply(latest, history, report).await {
            Ok(text) => text,
            Err(AssistantError::Unavailable) => {
                warn!("assistant requested but not configured");
                UNAVAILABLE_REPLY.to_string()
            }
            Err(e) => {
                error!("assistant call failed: {}", e);
                FAILURE_REPLY.to_string()
            }
        }
    }

    async fn try_reply(
        &self,
        latest: &str,
        history: &[Turn],
        report: &Report,
    ) -> Result<String, AssistantError> {
        let assistant = self.assistant.as_ref().ok_or(AssistantError::Unavailable)?;
        let instruction = prompt::instruction(report);
        let start = history.len().saturating_sub(ASSISTANT_WINDOW);
        let window = &history[start..];

        tokio::time::timeout(self.timeout, assistant.complete(&instruction, window, latest))
            .await
            .map_err(|_| AssistantError::Timeout)?
    }
}
