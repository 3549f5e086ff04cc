//! Deep links and link shortening.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use ferry_core::Token;

use crate::config::LinksConfig;
use crate::error::ServerError;

/// Telegram deep link that opens the bot with `/start <token>`.
pub fn deep_link(bot_username: &str, token: &Token) -> String {
    format!("https://t.me/{bot_username}?start={token}")
}

#[derive(Debug, Error)]
enum ShortenError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("shortener answered HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed shortener response: {0}")]
    Malformed(String),
}

#[derive(Serialize)]
struct ShortenRequest<'a> {
    api_key: &'a str,
    url: &'a str,
}

#[derive(Deserialize)]
struct ShortenResponse {
    short_url: Option<String>,
}

/// Shortens deep links for display, never failing.
///
/// Tries the custom shortener first when one is configured, then TinyURL
/// when enabled, and finally returns the long URL unchanged.
#[derive(Debug, Clone)]
pub struct LinkPresenter {
    config: LinksConfig,
    client: Client,
}

impl LinkPresenter {
    pub fn new(config: LinksConfig) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ServerError::Config(format!("link shortener client: {e}")))?;
        Ok(Self { config, client })
    }

    pub async fn shorten(&self, url: &str) -> String {
        if let (Some(endpoint), Some(api_key)) = (
            self.config.shortener_url.as_deref(),
            self.config.shortener_api_key.as_deref(),
        ) {
            match self.custom(endpoint, api_key, url).await {
                Ok(short) => return short,
                Err(e) => warn!(error = %e, "custom shortener failed"),
            }
        }

        if self.config.tinyurl_fallback {
            match self.tinyurl(url).await {
                Ok(short) => return short,
                Err(e) => warn!(error = %e, "tinyurl shortener failed"),
            }
        }

        debug!("serving long link");
        url.to_owned()
    }

    async fn custom(&self, endpoint: &str, api_key: &str, url: &str) -> Result<String, ShortenError> {
        let response = self
            .client
            .post(endpoint)
            .json(&ShortenRequest { api_key, url })
            .send()
            .await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(ShortenError::Status(response.status()));
        }
        response
            .json::<ShortenResponse>()
            .await?
            .short_url
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ShortenError::Malformed("missing short_url".into()))
    }

    async fn tinyurl(&self, url: &str) -> Result<String, ShortenError> {
        let request_url = format!(
            "{}?url={}",
            self.config.tinyurl_url,
            utf8_percent_encode(url, NON_ALPHANUMERIC)
        );
        let response = self.client.get(request_url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(ShortenError::Status(response.status()));
        }
        let text = response.text().await?;
        let short = text.trim();
        if short.starts_with("http") {
            Ok(short.to_owned())
        } else {
            Err(ShortenError::Malformed(short.chars().take(64).collect()))
        }
    }
}
