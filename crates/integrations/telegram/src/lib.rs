//! Telegram Bot API integration for Ferry.
//!
//! [`TelegramClient`] wraps the handful of
//! [Bot API](https://core.telegram.org/bots/api) methods Ferry needs.
//! [`TelegramRelay`] builds on it to implement
//! [`BlobRelay`](ferry_relay::BlobRelay), keeping file copies as messages in
//! a private log channel.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ferry_telegram::{TelegramClient, TelegramConfig, TelegramRelay};
//!
//! let config = TelegramConfig::new("123456:ABC-DEF");
//! let client = Arc::new(TelegramClient::new(config).unwrap());
//! let relay = TelegramRelay::new(client, -1001234567890);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod relay;
pub mod types;

pub use client::TelegramClient;
pub use config::TelegramConfig;
pub use error::TelegramError;
pub use relay::TelegramRelay;
pub use types::{Audio, Chat, Document, Message, MessageId, PhotoSize, Update, User, Video};
