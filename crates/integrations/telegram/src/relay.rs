use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use ferry_core::ContentLocator;
use ferry_relay::{BlobRelay, ContentSource, RelayError};

use crate::client::TelegramClient;

/// [`BlobRelay`] that keeps copies as messages in a private log channel.
///
/// The bot must be an administrator of the log channel so it can post and
/// delete there.
#[derive(Debug, Clone)]
pub struct TelegramRelay {
    client: Arc<TelegramClient>,
    log_channel: i64,
}

impl TelegramRelay {
    pub fn new(client: Arc<TelegramClient>, log_channel: i64) -> Self {
        Self {
            client,
            log_channel,
        }
    }

    pub fn log_channel(&self) -> i64 {
        self.log_channel
    }
}

#[async_trait]
impl BlobRelay for TelegramRelay {
    #[instrument(skip(self), fields(relay = "telegram", log_channel = self.log_channel))]
    async fn store(&self, source: &ContentSource) -> Result<ContentLocator, RelayError> {
        let copied = self
            .client
            .copy_message(self.log_channel, source.chat_id, source.message_id, None)
            .await?;
        let locator = ContentLocator::new(self.log_channel, copied.message_id);
        debug!(%locator, "copied upload into log channel");
        Ok(locator)
    }

    #[instrument(skip(self, caption), fields(relay = "telegram"))]
    async fn forward(
        &self,
        locator: &ContentLocator,
        destination_chat: i64,
        caption: Option<&str>,
    ) -> Result<(), RelayError> {
        self.client
            .copy_message(
                destination_chat,
                locator.chat_id,
                locator.message_id,
                caption,
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self), fields(relay = "telegram"))]
    async fn delete(&self, locator: &ContentLocator) -> Result<(), RelayError> {
        let deleted = self
            .client
            .delete_message(locator.chat_id, locator.message_id)
            .await?;
        if deleted {
            Ok(())
        } else {
            Err(RelayError::NotFound(locator.to_string()))
        }
    }
}
