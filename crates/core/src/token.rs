//! Retrieval tokens.
//!
//! A token is the record identifier behind a fixed prefix. It is obfuscation
//! only: anyone who can reconstruct a valid identifier can resolve the record.

use std::fmt;

use thiserror::Error;

use crate::record::RecordId;

/// Prefix every retrieval token carries, letting the front-end tell a
/// retrieval request apart from other command payloads.
pub const TOKEN_PREFIX: &str = "file_";

/// Reasons a string cannot be decoded into a [`RecordId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// The string does not carry [`TOKEN_PREFIX`].
    #[error("not a file token")]
    NotAToken,

    /// The prefix is present but the remainder is not a record identifier.
    #[error("invalid record identifier in token: {0:?}")]
    InvalidIdentifier(String),
}

/// An opaque, URL-safe retrieval token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Encode a record identifier.
    #[must_use]
    pub fn encode(id: &RecordId) -> Self {
        Self(format!("{TOKEN_PREFIX}{id}"))
    }

    /// Decode a token string back into the record identifier it names.
    pub fn decode(raw: &str) -> Result<RecordId, TokenError> {
        let suffix = raw.strip_prefix(TOKEN_PREFIX).ok_or(TokenError::NotAToken)?;
        suffix
            .parse()
            .map_err(|_| TokenError::InvalidIdentifier(suffix.to_owned()))
    }

    /// Whether `raw` looks like a token at all (prefix check only).
    #[must_use]
    pub fn is_token(raw: &str) -> bool {
        raw.starts_with(TOKEN_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier this token was minted from.
    pub fn record_id(&self) -> Result<RecordId, TokenError> {
        Self::decode(&self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
