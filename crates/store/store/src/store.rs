use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use ferry_core::{FileRecord, NewFileRecord, RecordId};

use crate::error::StoreError;

/// A lazily evaluated, single-pass sequence of records.
pub type RecordStream<'a> = BoxStream<'a, Result<FileRecord, StoreError>>;

/// Durable storage for file records.
///
/// Implementations must be `Send + Sync` and safe for concurrent access. The
/// store is the only place a record's relay locator is kept, so it must never
/// drop a record on its own; eviction is driven from outside.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record and return the identifier the store assigned.
    async fn insert(&self, record: &NewFileRecord) -> Result<RecordId, StoreError>;

    /// Look up a record by id. Returns `None` if it does not exist.
    ///
    /// Expired records are still returned; expiry is the caller's decision.
    async fn find_by_id(&self, id: &RecordId) -> Result<Option<FileRecord>, StoreError>;

    /// Stream every record with `expires_at <= now`, oldest expiry first.
    ///
    /// Backends page through an expiry index rather than loading the whole
    /// collection. A record deleted while the stream is being consumed may or
    /// may not still be yielded.
    fn find_expired(&self, now: DateTime<Utc>) -> RecordStream<'_>;

    /// Stream at most `limit` records whose display name contains `needle`,
    /// case-insensitively, newest `created_at` first.
    fn find_by_name<'a>(&'a self, needle: &'a str, limit: usize) -> RecordStream<'a>;

    /// Delete a record. Returns `true` if it existed.
    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError>;

    /// Verify the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Release connections held by the store.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
