use std::time::Duration;

/// Default Bot API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Configuration for the Telegram client.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token issued by `@BotFather`. Embedded in every request URL.
    pub bot_token: String,

    /// Base URL for the Bot API. Override this for testing against a mock
    /// server.
    pub api_base_url: String,

    /// Timeout applied to ordinary requests.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TelegramConfig {
    /// Create a new configuration with the given bot token.
    ///
    /// Uses the public Bot API endpoint and a 30 second request timeout.
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Override the API base URL (useful for testing).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
