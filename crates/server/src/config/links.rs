use std::time::Duration;

use serde::Deserialize;

/// Configuration for link shortening.
#[derive(Clone, Deserialize)]
pub struct LinksConfig {
    /// Custom shortener endpoint. Receives `{"api_key", "url"}` as JSON and
    /// answers with `{"short_url"}`.
    pub shortener_url: Option<String>,

    /// API key sent to the custom shortener.
    pub shortener_api_key: Option<String>,

    /// Whether to fall back to TinyURL when no custom shortener answers.
    #[serde(default = "default_tinyurl_fallback")]
    pub tinyurl_fallback: bool,

    /// TinyURL creation endpoint.
    #[serde(default = "default_tinyurl_url")]
    pub tinyurl_url: String,

    /// Timeout for each shortener request (seconds).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for LinksConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinksConfig")
            .field("shortener_url", &self.shortener_url)
            .field(
                "shortener_api_key",
                &self.shortener_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("tinyurl_fallback", &self.tinyurl_fallback)
            .field("tinyurl_url", &self.tinyurl_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            shortener_url: None,
            shortener_api_key: None,
            tinyurl_fallback: default_tinyurl_fallback(),
            tinyurl_url: default_tinyurl_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl LinksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_tinyurl_fallback() -> bool {
    true
}

fn default_tinyurl_url() -> String {
    "https://tinyurl.com/api-create.php".to_owned()
}

fn default_timeout_seconds() -> u64 {
    15
}
