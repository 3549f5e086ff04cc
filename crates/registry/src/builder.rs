use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use ferry_core::{Clock, SystemClock};
use ferry_relay::BlobRelay;
use ferry_store::MetadataStore;

use crate::error::RegistryError;
use crate::registry::{DEFAULT_SEARCH_CAP, FileRegistry};

/// Default record lifetime.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Fluent builder for constructing a [`FileRegistry`].
///
/// A [`MetadataStore`] and a [`BlobRelay`] must be supplied. The clock
/// defaults to [`SystemClock`], retention to 24 hours and the search cap to
/// [`DEFAULT_SEARCH_CAP`].
pub struct FileRegistryBuilder {
    store: Option<Arc<dyn MetadataStore>>,
    relay: Option<Arc<dyn BlobRelay>>,
    clock: Option<Arc<dyn Clock>>,
    retention: Duration,
    search_cap: usize,
}

impl FileRegistryBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            relay: None,
            clock: None,
            retention: DEFAULT_RETENTION,
            search_cap: DEFAULT_SEARCH_CAP,
        }
    }

    /// Set the metadata store implementation.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn MetadataStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the blob relay implementation.
    #[must_use]
    pub fn relay(mut self, relay: Arc<dyn BlobRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    /// Replace the system clock, typically with a `ManualClock` in tests.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Hard upper bound on search results.
    #[must_use]
    pub fn search_cap(mut self, cap: usize) -> Self {
        self.search_cap = cap;
        self
    }

    /// Consume the builder and produce a [`FileRegistry`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Configuration`] if the store or relay is
    /// missing, or if retention is zero or out of range.
    pub fn build(self) -> Result<FileRegistry, RegistryError> {
        let store = self
            .store
            .ok_or_else(|| RegistryError::Configuration("metadata store is required".into()))?;

        let relay = self
            .relay
            .ok_or_else(|| RegistryError::Configuration("blob relay is required".into()))?;

        if self.retention.is_zero() {
            return Err(RegistryError::Configuration(
                "retention must be greater than zero".into(),
            ));
        }
        let retention = TimeDelta::from_std(self.retention)
            .map_err(|e| RegistryError::Configuration(format!("retention out of range: {e}")))?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(FileRegistry {
            store,
            relay,
            clock,
            retention,
            search_cap: self.search_cap,
        })
    }
}

impl Default for FileRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
