use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::types::{ApiResponse, GetUpdates, ReplyMarkup, SendMessage, Update};
use crate::kernel::event::{InputEvent, Output};
use crate::kernel::notifier::{DeliveryError, Messenger};
use crate::kernel::report::Submitter;

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub token: String,
    pub api_url: String,
    /// Long-poll duration requested from the server.
    pub poll_timeout: Duration,
    /// Bound on a single sendMessage call.
    pub send_timeout: Duration,
}

#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    options: TelegramOptions,
}

impl TelegramClient {
    pub fn new(options: TelegramOptions) -> Self {
        Self {
            client: Client::builder()
                // Must outlive the long poll
                .timeout(options.poll_timeout + Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            options,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.options.api_url.trim_end_matches('/'),
            self.options.token,
            method
        )
    }

    /// Long-polls for new updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>> {
        let body = GetUpdates {
            offset,
            timeout: self.options.poll_timeout.as_secs(),
            allowed_updates: vec!["message"],
        };
        let response = self
            .client
            .post(self.method_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .context("getUpdates request failed")?;
        let envelope: ApiResponse<Vec<Update>> =
            response.json().await.context("getUpdates returned malformed JSON")?;
        unwrap_envelope(envelope).map_err(|e| anyhow!("getUpdates rejected: {}", e))
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send(&self, message: &Output) -> Result<(), DeliveryError> {
        let body = SendMessage {
            chat_id: message.chat_id,
            text: &message.text,
            parse_mode: message.markdown.then_some("Markdown"),
            reply_markup: ReplyMarkup::from_keyboard(&message.keyboard),
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(self.options.send_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Network(e.to_string())
                }
            })?;
        let envelope: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| DeliveryError::Parse(e.to_string()))?;
        unwrap_envelope(envelope).map_err(DeliveryError::Api)?;
        debug!(chat_id = message.chat_id, "message sent");
        Ok(())
    }
}

fn unwrap_envelope<T: DeserializeOwned>(envelope: ApiResponse<T>) -> Result<T, String> {
    match envelope {
        ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
        ApiResponse { description, .. } => {
            Err(description.unwrap_or_else(|| "no description".to_string()))
        }
    }
}

/// Text messages with a known sender become kernel input; everything else is dropped.
pub fn to_input(update: &Update) -> Option<InputEvent> {
    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?;
    let from = message.from.as_ref()?;
    let submitter = Submitter {
        id: from.id,
        first_name: from.first_name.clone(),
        username: from.username.clone(),
    };
    Some(InputEvent::from_text(message.chat.id, submitter, text))
}
