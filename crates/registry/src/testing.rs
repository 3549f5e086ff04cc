use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;

use ferry_core::{ContentLocator, FileRecord, NewFileRecord, RecordId};
use ferry_relay::{BlobRelay, ContentSource, MemoryRelay, RelayError};
use ferry_store::{MetadataStore, RecordStream, StoreError};
use ferry_store_memory::MemoryMetadataStore;

/// A [`MemoryMetadataStore`] whose operations can be made to fail on demand.
#[derive(Debug, Default)]
pub(crate) struct FlakyStore {
    inner: MemoryMetadataStore,
    fail_inserts: AtomicBool,
    fail_reads: AtomicBool,
    fail_deletes: AtomicBool,
    fail_scans: AtomicBool,
    poisoned: Mutex<HashSet<RecordId>>,
    ghosts: Mutex<Vec<FileRecord>>,
    scans: Mutex<Vec<Instant>>,
}

impl FlakyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inner(&self) -> &MemoryMetadataStore {
        &self.inner
    }

    pub(crate) fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make `find_expired` yield an error instead of records.
    pub(crate) fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    /// Fail every delete of `id` while other deletes succeed.
    pub(crate) fn poison(&self, id: RecordId) {
        self.poisoned.lock().unwrap().insert(id);
    }

    /// Append `record` to every expired scan even if it is no longer stored.
    pub(crate) fn ghost(&self, record: FileRecord) {
        self.ghosts.lock().unwrap().push(record);
    }

    /// When each `find_expired` call started, in call order.
    pub(crate) fn scan_times(&self) -> Vec<Instant> {
        self.scans.lock().unwrap().clone()
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Backend(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MetadataStore for FlakyStore {
    async fn insert(&self, record: &NewFileRecord) -> Result<RecordId, StoreError> {
        Self::check(&self.fail_inserts, "insert")?;
        self.inner.insert(record).await
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<FileRecord>, StoreError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.find_by_id(id).await
    }

    fn find_expired(&self, now: DateTime<Utc>) -> RecordStream<'_> {
        self.scans.lock().unwrap().push(Instant::now());
        if let Err(e) = Self::check(&self.fail_scans, "scan") {
            return stream::iter([Err(e)]).boxed();
        }
        let ghosts: Vec<FileRecord> = self.ghosts.lock().unwrap().clone();
        self.inner
            .find_expired(now)
            .chain(stream::iter(ghosts.into_iter().map(Ok)))
            .boxed()
    }

    fn find_by_name<'a>(&'a self, needle: &'a str, limit: usize) -> RecordStream<'a> {
        self.inner.find_by_name(needle, limit)
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        Self::check(&self.fail_deletes, "delete")?;
        if self.poisoned.lock().unwrap().contains(id) {
            return Err(StoreError::Backend(format!("injected delete failure for {id}")));
        }
        self.inner.delete_by_id(id).await
    }
}

/// A [`MemoryRelay`] whose deletes suspend before touching the copy.
///
/// A zero delay yields to the scheduler once, which is enough to interleave
/// two deletion paths under `tokio::join!`.
#[derive(Debug)]
pub(crate) struct SlowRelay {
    inner: Arc<MemoryRelay>,
    delete_delay: Duration,
}

impl SlowRelay {
    pub(crate) fn new(inner: Arc<MemoryRelay>, delete_delay: Duration) -> Self {
        Self {
            inner,
            delete_delay,
        }
    }
}

#[async_trait]
impl BlobRelay for SlowRelay {
    async fn store(&self, source: &ContentSource) -> Result<ContentLocator, RelayError> {
        self.inner.store(source).await
    }

    async fn forward(
        &self,
        locator: &ContentLocator,
        destination_chat: i64,
        caption: Option<&str>,
    ) -> Result<(), RelayError> {
        self.inner.forward(locator, destination_chat, caption).await
    }

    async fn delete(&self, locator: &ContentLocator) -> Result<(), RelayError> {
        if self.delete_delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delete_delay).await;
        }
        self.inner.delete(locator).await
    }
}
