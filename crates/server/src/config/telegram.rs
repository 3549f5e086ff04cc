use std::time::Duration;

use serde::Deserialize;

/// Environment variable consulted when `bot_token` is not set in the file.
pub const BOT_TOKEN_ENV: &str = "FERRY_BOT_TOKEN";

/// Configuration for the Telegram front-end and relay.
#[derive(Deserialize)]
pub struct TelegramServerConfig {
    /// Bot token from `@BotFather`. Falls back to `FERRY_BOT_TOKEN`.
    pub bot_token: Option<String>,

    /// Bot username used in deep links. Looked up with `getMe` when unset.
    pub bot_username: Option<String>,

    /// Private channel holding relay copies. Required by the `telegram`
    /// relay backend; the bot must be an administrator there.
    pub log_channel: Option<i64>,

    /// Channel `/broadcast` copies messages into.
    pub update_channel: Option<i64>,

    /// User ids allowed to run administrative commands.
    #[serde(default)]
    pub admin_ids: Vec<i64>,

    /// Bot API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How long `getUpdates` long-polls (seconds).
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,

    /// HTTP timeout for ordinary Bot API calls (seconds).
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Upper bound on messages handled concurrently.
    #[serde(default = "default_max_concurrent_updates")]
    pub max_concurrent_updates: usize,
}

impl std::fmt::Debug for TelegramServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramServerConfig")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "[REDACTED]"))
            .field("bot_username", &self.bot_username)
            .field("log_channel", &self.log_channel)
            .field("update_channel", &self.update_channel)
            .field("admin_ids", &self.admin_ids)
            .field("api_base_url", &self.api_base_url)
            .field("poll_timeout_seconds", &self.poll_timeout_seconds)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("max_concurrent_updates", &self.max_concurrent_updates)
            .finish()
    }
}

impl Default for TelegramServerConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            bot_username: None,
            log_channel: None,
            update_channel: None,
            admin_ids: Vec::new(),
            api_base_url: default_api_base_url(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            max_concurrent_updates: default_max_concurrent_updates(),
        }
    }
}

impl TelegramServerConfig {
    /// The configured bot token, or the `FERRY_BOT_TOKEN` environment variable.
    pub fn resolve_bot_token(&self) -> Option<String> {
        self.bot_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var(BOT_TOKEN_ENV).ok().filter(|t| !t.is_empty()))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_api_base_url() -> String {
    ferry_telegram::config::DEFAULT_API_BASE_URL.to_owned()
}

fn default_poll_timeout_seconds() -> u64 {
    30
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_concurrent_updates() -> usize {
    16
}
