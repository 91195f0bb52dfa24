use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::kernel::UserId;
use crate::services::llm::client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::services::telegram::client::DEFAULT_API_URL;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub telegram_api_url: String,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub recipients_file: PathBuf,
    pub default_recipients: Vec<UserId>,
    pub assistant_timeout: Duration,
    pub delivery_timeout: Duration,
    pub poll_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            telegram_token: get("TELEGRAM_TOKEN").context("TELEGRAM_TOKEN must be set")?,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            recipients_file: get("RECIPIENTS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("admins.txt")),
            default_recipients: match get("DEFAULT_RECIPIENTS") {
                Some(list) => parse_id_list(&list).context("DEFAULT_RECIPIENTS must be comma-separated integers")?,
                None => Vec::new(),
            },
            assistant_timeout: secs(get("ASSISTANT_TIMEOUT_SECS"), 20)
                .context("ASSISTANT_TIMEOUT_SECS must be a valid number")?,
            delivery_timeout: secs(get("DELIVERY_TIMEOUT_SECS"), 10)
                .context("DELIVERY_TIMEOUT_SECS must be a valid number")?,
            poll_timeout: secs(get("POLL_TIMEOUT_SECS"), 25)
                .context("POLL_TIMEOUT_SECS must be a valid number")?,
        })
    }
}

fn secs(value: Option<String>, default: u64) -> Result<Duration> {
    let secs: u64 = match value {
        Some(v) => v.trim().parse()?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

fn parse_id_list(list: &str) -> Result<Vec<UserId>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<UserId>().with_context(|| format!("{:?} is not an identifier", s)))
        .collect()
}
