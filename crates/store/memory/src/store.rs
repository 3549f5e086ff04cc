use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::StreamExt;
use futures::stream;

use ferry_core::{FileRecord, NewFileRecord, RecordId};
use ferry_store::error::StoreError;
use ferry_store::store::{MetadataStore, RecordStream};

/// In-memory [`MetadataStore`] backed by a [`DashMap`].
///
/// Scans take a snapshot of the matching records up front, so streams never
/// hold map guards across await points.
#[derive(Debug, Default)]
pub struct MemoryMetadataStore {
    records: DashMap<RecordId, FileRecord>,
}

impl MemoryMetadataStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn snapshot(&self, keep: impl Fn(&FileRecord) -> bool) -> Vec<FileRecord> {
        self.records
            .iter()
            .filter(|entry| keep(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, record: &NewFileRecord) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        self.records.insert(id, record.clone().into_record(id));
        Ok(id)
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<FileRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    fn find_expired(&self, now: DateTime<Utc>) -> RecordStream<'_> {
        let mut expired = self.snapshot(|r| r.is_expired_at(now));
        expired.sort_by_key(|r| (r.expires_at, r.id));
        stream::iter(expired.into_iter().map(Ok)).boxed()
    }

    fn find_by_name<'a>(&'a self, needle: &'a str, limit: usize) -> RecordStream<'a> {
        let mut matches = self.snapshot(|r| r.name_matches(needle));
        matches.sort_by_key(|r| Reverse((r.created_at, r.id)));
        matches.truncate(limit);
        stream::iter(matches.into_iter().map(Ok)).boxed()
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        Ok(self.records.remove(id).is_some())
    }
}
