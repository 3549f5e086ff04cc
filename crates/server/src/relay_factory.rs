use std::sync::Arc;

use tracing::warn;

use ferry_relay::{BlobRelay, MemoryRelay};
use ferry_telegram::{TelegramClient, TelegramRelay};

use crate::config::{RelayConfig, TelegramServerConfig};
use crate::error::ServerError;

/// Create a blob relay from the given configuration.
///
/// The `telegram` backend shares `client` with the bot front-end.
pub fn create_relay(
    config: &RelayConfig,
    telegram: &TelegramServerConfig,
    client: &Arc<TelegramClient>,
) -> Result<Arc<dyn BlobRelay>, ServerError> {
    let relay: Arc<dyn BlobRelay> = match config.backend.as_str() {
        "telegram" => {
            let log_channel = telegram.log_channel.ok_or_else(|| {
                ServerError::Config("telegram relay backend requires [telegram] log_channel".into())
            })?;
            Arc::new(TelegramRelay::new(Arc::clone(client), log_channel))
        }
        "memory" => {
            warn!("memory relay in use: copies live in process and deliveries are only recorded");
            Arc::new(MemoryRelay::new())
        }
        other => {
            return Err(ServerError::Config(format!(
                "unsupported relay backend: {other}"
            )));
        }
    };

    Ok(relay)
}
