use thiserror::Error;

use ferry_core::{RecordId, TokenError};
use ferry_relay::RelayError;
use ferry_store::StoreError;

/// Errors surfaced by [`FileRegistry`](crate::FileRegistry) operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The blob relay could not take or hand out content.
    #[error("blob relay unavailable: {0}")]
    RelayUnavailable(#[source] RelayError),

    /// The metadata store could not be reached. Not retried here.
    #[error("metadata store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The token is malformed or is not a file token at all.
    #[error("invalid link: {0}")]
    InvalidLink(#[source] TokenError),

    /// The token named no live record: never existed, swept, or past expiry.
    #[error("link expired or invalid")]
    LinkExpiredOrInvalid,

    /// Administrative delete of an id the store does not know.
    #[error("file record not found: {0}")]
    NotFound(RecordId),

    /// The record resolved but its relay copy no longer does.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The registry was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl RegistryError {
    /// Link errors that must be presented identically to the requester, so
    /// they cannot probe which records exist.
    pub fn is_link_error(&self) -> bool {
        matches!(self, Self::InvalidLink(_) | Self::LinkExpiredOrInvalid)
    }
}
