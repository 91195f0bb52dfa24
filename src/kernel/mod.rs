//! Conversation kernel.
//!
//! Everything in here is transport-agnostic. Inbound messages arrive as
//! `InputEvent`s, outgoing text leaves as `Output`s, and the only I/O the
//! kernel performs directly is the recipient file and the two capability
//! traits (`Assistant`, `Messenger`) it is handed at construction.

pub mod controller;
pub mod dispatch;
pub mod event;
pub mod extractor;
pub mod format;
pub mod history;
pub mod notifier;
pub mod reactor;
pub mod registry;
pub mod report;
pub mod state;

/// Numeric identifier of a messaging-platform user (and of their private chat).
pub type UserId = i64;
