use async_trait::async_trait;

use ferry_core::ContentLocator;

use crate::error::RelayError;
use crate::types::ContentSource;

/// Opaque proxy holding the raw bytes of forwarded files.
///
/// Implementors provide the actual storage mechanism. Ferry never reads or
/// writes content directly; it only moves references through the relay.
#[async_trait]
pub trait BlobRelay: Send + Sync {
    /// Take a relay-owned copy of the content at `source` and return its locator.
    async fn store(&self, source: &ContentSource) -> Result<ContentLocator, RelayError>;

    /// Deliver the content at `locator` to `destination_chat`, with an
    /// optional caption.
    ///
    /// Returns [`RelayError::NotFound`] if the locator no longer resolves.
    async fn forward(
        &self,
        locator: &ContentLocator,
        destination_chat: i64,
        caption: Option<&str>,
    ) -> Result<(), RelayError>;

    /// Delete the relay copy. Returns [`RelayError::NotFound`] if it was
    /// already gone.
    async fn delete(&self, locator: &ContentLocator) -> Result<(), RelayError>;

    /// Release resources held by the relay.
    async fn close(&self) -> Result<(), RelayError> {
        Ok(())
    }
}
