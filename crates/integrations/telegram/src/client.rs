use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::TelegramConfig;
use crate::error::TelegramError;
use crate::types::{
    ApiResponse, CopyMessageRequest, DeleteMessageRequest, GetUpdatesRequest, Message, MessageId,
    SendMessageRequest, Update, User,
};

/// Thin client over the Bot API methods Ferry uses.
pub struct TelegramClient {
    config: TelegramConfig,
    client: Client,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Strip the request URL, which embeds the bot token, from transport errors.
fn transport(e: reqwest::Error) -> TelegramError {
    TelegramError::Http(e.without_url())
}

impl TelegramClient {
    /// Create a new client with the configured request timeout.
    pub fn new(config: TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TelegramError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create a new client with a custom HTTP client.
    pub fn with_client(config: TelegramConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.bot_token
        )
    }

    /// POST `body` to `method` and unwrap the `ApiResponse` envelope.
    async fn call<B, T>(
        &self,
        method: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.post(self.method_url(method)).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!(method, "Telegram API rate limit hit");
                return Err(TelegramError::RateLimited { retry_after: None });
            }
            Err(_) if !status.is_success() => {
                return Err(TelegramError::Api {
                    code: status.as_u16(),
                    description: text,
                });
            }
            Err(e) => {
                return Err(TelegramError::InvalidResponse(format!(
                    "{method}: {e}"
                )));
            }
        };

        if envelope.ok {
            return envelope.result.ok_or_else(|| {
                TelegramError::InvalidResponse(format!("{method}: ok response without result"))
            });
        }

        let code = envelope.error_code.unwrap_or_else(|| status.as_u16());
        if code == 429 {
            let retry_after = envelope.parameters.and_then(|p| p.retry_after);
            warn!(method, ?retry_after, "Telegram API rate limit hit");
            return Err(TelegramError::RateLimited { retry_after });
        }
        Err(TelegramError::Api {
            code,
            description: envelope
                .description
                .unwrap_or_else(|| "unknown error".to_owned()),
        })
    }

    /// Identify the bot. Used as a connectivity check.
    #[instrument(skip(self))]
    pub async fn get_me(&self) -> Result<User, TelegramError> {
        self.call("getMe", &serde_json::json!({}), None).await
    }

    /// Long-poll for message updates newer than `offset`.
    ///
    /// The HTTP timeout is stretched by `poll_timeout` so the server can hold
    /// the request open.
    #[instrument(skip(self))]
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: &["message"],
        };
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                &request,
                Some(poll_timeout + self.config.request_timeout),
            )
            .await?;
        if !updates.is_empty() {
            debug!(count = updates.len(), "received updates");
        }
        Ok(updates)
    }

    /// Send a plain-text message with link previews disabled.
    #[instrument(skip(self, text))]
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<Message, TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            disable_web_page_preview: true,
        };
        self.call("sendMessage", &request, None).await
    }

    /// Copy a message into `chat_id` without a forward header.
    ///
    /// `caption` replaces the original caption when set.
    #[instrument(skip(self, caption))]
    pub async fn copy_message(
        &self,
        chat_id: i64,
        from_chat_id: i64,
        message_id: i64,
        caption: Option<&str>,
    ) -> Result<MessageId, TelegramError> {
        let request = CopyMessageRequest {
            chat_id,
            from_chat_id,
            message_id,
            caption,
        };
        self.call("copyMessage", &request, None).await
    }

    #[instrument(skip(self))]
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<bool, TelegramError> {
        let request = DeleteMessageRequest {
            chat_id,
            message_id,
        };
        self.call("deleteMessage", &request, None).await
    }
}
