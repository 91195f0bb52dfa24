//! Conversational completion capability.
//!
//! The controller only ever talks to `AssistantAdapter`, which turns every
//! failure into a canned apology. `Assistant` is the seam for the vendor
//! client and for test fakes.

pub mod adapter;
pub mod client;
pub mod prompt;

use async_trait::async_trait;
use thiserror::Error;

use crate::kernel::history::Turn;

pub use adapter::AssistantAdapter;
pub use client::{OpenAiAssistant, OpenAiOptions};

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("assistant is not configured")]
    Unavailable,
    #[error("assistant timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait Assistant: Send + Sync {
    /// One reply for `latest`, given the instruction block and the prior turns.
    async fn complete(
        &self,
        instruction: &str,
        history: &[Turn],
        latest: &str,
    ) -> Result<String, AssistantError>;
}
