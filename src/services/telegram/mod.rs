//! Minimal Telegram Bot API transport: long-poll for updates, send messages.

pub mod client;
pub mod types;

pub use client::{TelegramClient, TelegramOptions};
