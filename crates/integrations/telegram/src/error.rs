use ferry_relay::RelayError;
use thiserror::Error;

/// Errors specific to the Telegram client.
///
/// These get converted into [`RelayError`] at the relay boundary.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// An HTTP-level transport error occurred. The request URL, which carries
    /// the bot token, is stripped before the error is stored.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error {code}: {description}")]
    Api { code: u16, description: String },

    /// The Bot API answered 429 Too Many Requests.
    #[error("rate limited by Telegram (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    /// The response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client construction failed.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl TelegramError {
    /// Whether Telegram reported that the referenced message does not exist.
    ///
    /// Covers "message to copy not found", "message to delete not found" and
    /// similar `Bad Request` answers.
    pub fn is_message_not_found(&self) -> bool {
        match self {
            Self::Api { code, description } => {
                let description = description.to_ascii_lowercase();
                *code == 400 && description.contains("message") && description.contains("not found")
            }
            _ => false,
        }
    }
}

impl From<TelegramError> for RelayError {
    fn from(err: TelegramError) -> Self {
        if err.is_message_not_found() {
            return RelayError::NotFound(err.to_string());
        }
        match err {
            TelegramError::Api { code, .. } if code >= 500 => {
                RelayError::Unavailable(err.to_string())
            }
            TelegramError::Api { .. }
            | TelegramError::InvalidResponse(_)
            | TelegramError::Configuration(_) => RelayError::Rejected(err.to_string()),
            TelegramError::Http(_) | TelegramError::RateLimited { .. } => {
                RelayError::Unavailable(err.to_string())
            }
        }
    }
}
