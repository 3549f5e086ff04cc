use thiserror::Error;

use ferry_registry::RegistryError;
use ferry_relay::RelayError;
use ferry_store::StoreError;
use ferry_telegram::TelegramError;

/// Errors that can occur when starting or running the Ferry server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The metadata store failed, typically during the startup check.
    #[error("metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("blob relay error: {0}")]
    Relay(#[from] RelayError),

    /// A Telegram Bot API call failed.
    #[error("telegram error: {0}")]
    Telegram(#[from] TelegramError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
