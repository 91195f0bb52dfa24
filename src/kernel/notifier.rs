use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

use super::event::{Keyboard, Output};
use super::UserId;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("delivery timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("platform rejected message: {0}")]
    Api(String),
    #[error("unexpected response: {0}")]
    Parse(String),
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(&self, message: &Output) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
}

impl DeliveryReport {
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }
}

/// Fans a finished report out to every recipient, one attempt each.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    timeout: Duration,
}

impl Notifier {
    pub fn new(messenger: Arc<dyn Messenger>, timeout: Duration) -> Self {
        Self { messenger, timeout }
    }

    /// Attempts every recipient in order. Individual failures are logged and skipped.
    pub async fn broadcast(&self, recipients: &[UserId], text: &str) -> DeliveryReport {
        let mut report = DeliveryReport { attempted: recipients.len(), delivered: 0 };

        if recipients.is_empty() {
            warn!("no recipients registered, report was not delivered to anyone");
            return report;
        }

        for &recipient in recipients {
            let message = Output {
                chat_id: recipient,
                text: text.to_string(),
                keyboard: Keyboard::Keep,
                markdown: true,
            };
            let result = match tokio::time::timeout(self.timeout, self.messenger.send(&message)).await {
                Ok(result) => result,
                Err(_) => Err(DeliveryError::Timeout),
            };
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    info!(recipient, "report delivered");
                }
                Err(e) => error!(recipient, "report delivery failed: {}", e),
            }
        }

        info!(
            "report delivered to {} of {} recipients",
            report.delivered, report.attempted
        );
        report
    }
}
