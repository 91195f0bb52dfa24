use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use super::{Assistant, AssistantError};
use crate::kernel::history::{Role, Turn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const MAX_TOKENS: u32 = 300;
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct OpenAiOptions {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

/// Chat-completions client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiAssistant {
    client: Client,
    options: OpenAiOptions,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiAssistant {
    pub fn new(options: OpenAiOptions) -> Self {
        Self {
            client: Client::builder()
                .timeout(options.timeout) // network-level bound, the adapter adds its own
                .build()
                .unwrap_or_default(),
            options,
        }
    }

    fn build_request<'a>(
        &'a self,
        instruction: &'a str,
        history: &'a [Turn],
        latest: &'a str,
    ) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage { role: "system", content: instruction });
        for turn in history {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            messages.push(ChatMessage { role, content: &turn.content });
        }
        messages.push(ChatMessage { role: "user", content: latest });

        ChatRequest {
            model: &self.options.model,
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl Assistant for OpenAiAssistant {
    async fn complete(
        &self,
        instruction: &str,
        history: &[Turn],
        latest: &str,
    ) -> Result<String, AssistantError> {
        let body = self.build_request(instruction, history, latest);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.options.base_url.trim_end_matches('/')))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.options.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssistantError::Timeout
                } else {
                    AssistantError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(%status, "completion request rejected");
            return Err(AssistantError::Api(format!("{}: {}", status, detail)));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Parse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AssistantError::Parse("response carried no reply text".into()))?;

        info!(
            "assistant replied: {}...",
            content.chars().take(50).collect::<String>()
        );
        Ok(content)
    }
}
