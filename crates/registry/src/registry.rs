use std::sync::Arc;

use chrono::TimeDelta;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use ferry_core::{Clock, FileRecord, NewFileRecord, RecordId, Token};
use ferry_relay::{BlobRelay, ContentSource, RelayError};
use ferry_store::MetadataStore;

use crate::error::RegistryError;
use crate::eviction::{RelayCleanup, remove_relay_copy};
use crate::sweeper::{Sweeper, SweeperConfig};

/// Upper bound on search results, whatever the caller asks for.
pub const DEFAULT_SEARCH_CAP: usize = 10;

/// Content handed over for forwarding, plus best-effort descriptive metadata.
///
/// The caller has already checked the content is a supported media kind.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub source: ContentSource,
    pub owner_id: i64,
    pub owner_label: String,
    pub display_name: Option<String>,
    pub size_label: Option<String>,
}

/// Orchestrates record creation, resolution, search and deletion across the
/// metadata store and the blob relay.
pub struct FileRegistry {
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) relay: Arc<dyn BlobRelay>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) retention: TimeDelta,
    pub(crate) search_cap: usize,
}

impl std::fmt::Debug for FileRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRegistry")
            .field("retention", &self.retention)
            .field("search_cap", &self.search_cap)
            .finish_non_exhaustive()
    }
}

impl FileRegistry {
    /// How long a record lives after creation.
    pub fn retention(&self) -> TimeDelta {
        self.retention
    }

    pub fn search_cap(&self) -> usize {
        self.search_cap
    }

    /// Build a [`Sweeper`] sharing this registry's store, relay and clock.
    pub fn sweeper(&self, config: SweeperConfig, shutdown_rx: mpsc::Receiver<()>) -> Sweeper {
        Sweeper::new(
            config,
            Arc::clone(&self.store),
            Arc::clone(&self.relay),
            Arc::clone(&self.clock),
            shutdown_rx,
        )
    }

    /// Store content in the relay, persist its record and mint a token.
    ///
    /// The relay write completes before the metadata write starts. If the
    /// metadata write fails the relay copy is deleted on a best-effort basis.
    #[instrument(skip(self, request), fields(owner_id = request.owner_id, source = %request.source))]
    pub async fn create(&self, request: UploadRequest) -> Result<Token, RegistryError> {
        let locator = self.relay.store(&request.source).await.map_err(|e| {
            warn!(error = %e, "relay refused upload; nothing persisted");
            RegistryError::RelayUnavailable(e)
        })?;

        let record = NewFileRecord::new(locator, self.clock.now(), self.retention)
            .with_owner(request.owner_id, request.owner_label)
            .with_display_name(request.display_name)
            .with_size_label(request.size_label);

        match self.store.insert(&record).await {
            Ok(id) => {
                info!(
                    record_id = %id,
                    %locator,
                    expires_at = %record.expires_at,
                    "file record created"
                );
                Ok(Token::encode(&id))
            }
            Err(e) => {
                error!(error = %e, %locator, "failed to persist file record; rolling back relay copy");
                if let Err(rollback) = self.relay.delete(&locator).await {
                    warn!(error = %rollback, %locator, "relay rollback failed; copy left orphaned");
                }
                Err(RegistryError::StoreUnavailable(e))
            }
        }
    }

    /// Resolve a token to its live record.
    ///
    /// Missing and expired records are reported the same way. Resolution
    /// never changes state and never extends a record's lifetime.
    pub async fn resolve(&self, token: &str) -> Result<FileRecord, RegistryError> {
        let id = Token::decode(token).map_err(RegistryError::InvalidLink)?;
        match self.store.find_by_id(&id).await? {
            Some(record) if !record.is_expired_at(self.clock.now()) => Ok(record),
            Some(record) => {
                debug!(record_id = %id, expires_at = %record.expires_at, "record past expiry, awaiting sweep");
                Err(RegistryError::LinkExpiredOrInvalid)
            }
            None => Err(RegistryError::LinkExpiredOrInvalid),
        }
    }

    /// Forward a resolved record's content to `destination_chat`.
    ///
    /// A locator that no longer resolves fails with
    /// [`RegistryError::DeliveryFailed`]; nothing partial is sent.
    pub async fn deliver(
        &self,
        record: &FileRecord,
        destination_chat: i64,
        caption: Option<&str>,
    ) -> Result<(), RegistryError> {
        match self
            .relay
            .forward(&record.content_locator, destination_chat, caption)
            .await
        {
            Ok(()) => {
                debug!(record_id = %record.id, destination_chat, "file delivered");
                Ok(())
            }
            Err(RelayError::NotFound(detail)) => {
                warn!(record_id = %record.id, %detail, "relay copy missing for live record");
                Err(RegistryError::DeliveryFailed(detail))
            }
            Err(e) => Err(RegistryError::RelayUnavailable(e)),
        }
    }

    /// Case-insensitive substring search on display names, newest first.
    ///
    /// At most `min(limit, search_cap)` records are produced. Matches already
    /// past expiry are skipped, so the result may be shorter than the cap.
    pub fn search<'a>(
        &'a self,
        keyword: &'a str,
        limit: usize,
    ) -> BoxStream<'a, Result<FileRecord, RegistryError>> {
        let now = self.clock.now();
        self.store
            .find_by_name(keyword, limit.min(self.search_cap))
            .err_into::<RegistryError>()
            .try_filter(move |record| futures::future::ready(!record.is_expired_at(now)))
            .boxed()
    }

    /// Administrative delete: relay copy first, then the record.
    ///
    /// A relay failure is logged and does not stop the metadata delete. If
    /// the sweeper removed the record between lookup and delete, that counts
    /// as success.
    #[instrument(skip(self), fields(record_id = %id))]
    pub async fn delete(&self, id: &RecordId) -> Result<(), RegistryError> {
        let record = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(RegistryError::NotFound(*id))?;

        let relay = remove_relay_copy(self.relay.as_ref(), &record).await;
        let existed = self.store.delete_by_id(id).await?;
        if !existed {
            debug!("record already removed by a concurrent eviction");
        }
        info!(relay_removed = relay == RelayCleanup::Removed, "file record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use futures::TryStreamExt;

    use ferry_core::{ManualClock, TokenError};
    use ferry_relay::MemoryRelay;
    use ferry_store_memory::MemoryMetadataStore;

    use super::*;
    use crate::builder::FileRegistryBuilder;
    use crate::testing::FlakyStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    struct Harness {
        registry: FileRegistry,
        store: Arc<FlakyStore>,
        relay: Arc<MemoryRelay>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let store = Arc::new(FlakyStore::new());
        let relay = Arc::new(MemoryRelay::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let registry = FileRegistryBuilder::new()
            .store(store.clone())
            .relay(relay.clone())
            .clock(clock.clone())
            .retention(std::time::Duration::from_secs(6 * 3600))
            .build()
            .unwrap();
        Harness {
            registry,
            store,
            relay,
            clock,
        }
    }

    fn upload(name: &str) -> UploadRequest {
        UploadRequest {
            source: ContentSource::new(500, 77),
            owner_id: 42,
            owner_label: "alice".into(),
            display_name: Some(name.into()),
            size_label: Some("12.3 MB".into()),
        }
    }

    #[tokio::test]
    async fn create_then_resolve() {
        let h = harness();
        let token = h.registry.create(upload("clip.mp4")).await.unwrap();
        assert!(token.as_str().starts_with("file_"));

        let record = h.registry.resolve(token.as_str()).await.unwrap();
        assert!(h.relay.contains(&record.content_locator));
        assert_eq!(record.created_at, t0());
        assert_eq!(record.expires_at, record.created_at + TimeDelta::hours(6));
        assert_eq!(record.owner_id, 42);
        assert_eq!(record.owner_label, "alice");
        assert_eq!(record.display_name, "clip.mp4");
        assert_eq!(record.size_label, "12.3 MB");
    }

    #[tokio::test]
    async fn retention_example_timeline() {
        let h = harness();
        let token = h.registry.create(upload("clip.mp4")).await.unwrap();

        h.clock.advance(TimeDelta::hours(1));
        assert!(h.registry.resolve(token.as_str()).await.is_ok());

        h.clock.advance(TimeDelta::hours(6));
        let err = h.registry.resolve(token.as_str()).await.unwrap_err();
        assert!(matches!(err, RegistryError::LinkExpiredOrInvalid));
        // Defensive expiry: the record is still stored, only hidden.
        assert_eq!(h.store.inner().len(), 1);
    }

    #[tokio::test]
    async fn missing_metadata_renders_unknown() {
        let h = harness();
        let mut request = upload("x");
        request.display_name = None;
        request.size_label = None;
        let token = h.registry.create(request).await.unwrap();
        let record = h.registry.resolve(token.as_str()).await.unwrap();
        assert_eq!(record.display_name, "unknown");
        assert_eq!(record.size_label, "unknown");
    }

    #[tokio::test]
    async fn relay_failure_persists_nothing() {
        let h = harness();
        h.relay.fail_stores(true);
        let err = h.registry.create(upload("a.pdf")).await.unwrap_err();
        assert!(matches!(err, RegistryError::RelayUnavailable(_)));
        assert!(h.store.inner().is_empty());
        assert!(h.relay.is_empty());
    }

    #[tokio::test]
    async fn store_failure_rolls_back_relay_copy() {
        let h = harness();
        h.store.fail_inserts(true);
        let err = h.registry.create(upload("a.pdf")).await.unwrap_err();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
        assert!(h.relay.is_empty(), "relay copy should be rolled back");
        assert_eq!(h.relay.delete_calls(), 1);
    }

    #[tokio::test]
    async fn failed_rollback_still_reports_store_error() {
        let h = harness();
        h.store.fail_inserts(true);
        h.relay.fail_deletes(true);
        let err = h.registry.create(upload("a.pdf")).await.unwrap_err();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
        // The orphaned relay copy is acceptable; orphaned metadata is not.
        assert_eq!(h.relay.len(), 1);
        assert!(h.store.inner().is_empty());
    }

    #[tokio::test]
    async fn malformed_tokens_are_invalid_links() {
        let h = harness();
        let err = h.registry.resolve("hello").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidLink(TokenError::NotAToken)));
        assert!(err.is_link_error());

        let err = h.registry.resolve("file_nothex").await.unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidLink(TokenError::InvalidIdentifier(_))
        ));
    }

    #[tokio::test]
    async fn unknown_record_is_expired_or_invalid() {
        let h = harness();
        let token = Token::encode(&RecordId::generate());
        let err = h.registry.resolve(token.as_str()).await.unwrap_err();
        assert!(matches!(err, RegistryError::LinkExpiredOrInvalid));
    }

    #[tokio::test]
    async fn resolve_surfaces_store_outage() {
        let h = harness();
        let token = h.registry.create(upload("a.pdf")).await.unwrap();
        h.store.fail_reads(true);
        let err = h.registry.resolve(token.as_str()).await.unwrap_err();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn deliver_forwards_through_relay() {
        let h = harness();
        let token = h.registry.create(upload("clip.mp4")).await.unwrap();
        let record = h.registry.resolve(token.as_str()).await.unwrap();
        h.registry
            .deliver(&record, 1234, Some("clip.mp4"))
            .await
            .unwrap();

        let deliveries = h.relay.deliveries().await;
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].locator, record.content_locator);
        assert_eq!(deliveries[0].destination_chat, 1234);
    }

    #[tokio::test]
    async fn deliver_fails_cleanly_when_relay_copy_is_gone() {
        let h = harness();
        let token = h.registry.create(upload("clip.mp4")).await.unwrap();
        let record = h.registry.resolve(token.as_str()).await.unwrap();
        h.relay.lose(&record.content_locator);

        let err = h.registry.deliver(&record, 1234, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::DeliveryFailed(_)));
        assert!(h.relay.deliveries().await.is_empty());
    }

    #[tokio::test]
    async fn deliver_reports_relay_outage() {
        let h = harness();
        let token = h.registry.create(upload("clip.mp4")).await.unwrap();
        let record = h.registry.resolve(token.as_str()).await.unwrap();
        h.relay.fail_forwards(true);
        let err = h.registry.deliver(&record, 1, None).await.unwrap_err();
        assert!(matches!(err, RegistryError::RelayUnavailable(_)));
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring_newest_first() {
        let h = harness();
        h.registry.create(upload("Report_Final.pdf")).await.unwrap();
        h.clock.advance(TimeDelta::minutes(1));
        h.registry.create(upload("holiday.jpg")).await.unwrap();
        h.clock.advance(TimeDelta::minutes(1));
        h.registry.create(upload("FINAL-cut.mov")).await.unwrap();

        let found: Vec<FileRecord> = h.registry.search("final", 10).try_collect().await.unwrap();
        let names: Vec<&str> = found.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["FINAL-cut.mov", "Report_Final.pdf"]);
    }

    #[tokio::test]
    async fn search_never_exceeds_limit_or_cap() {
        let h = harness();
        for i in 0..15 {
            h.registry.create(upload(&format!("part-{i}.bin"))).await.unwrap();
            h.clock.advance(TimeDelta::seconds(1));
        }
        let three: Vec<FileRecord> = h.registry.search("part", 3).try_collect().await.unwrap();
        assert_eq!(three.len(), 3);

        let capped: Vec<FileRecord> = h.registry.search("part", 500).try_collect().await.unwrap();
        assert_eq!(capped.len(), DEFAULT_SEARCH_CAP);
    }

    #[tokio::test]
    async fn search_with_no_match_is_empty() {
        let h = harness();
        h.registry.create(upload("a.pdf")).await.unwrap();
        let found: Vec<FileRecord> = h.registry.search("zzz", 10).try_collect().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn search_hides_records_past_expiry() {
        let h = harness();
        h.registry.create(upload("old-report.pdf")).await.unwrap();
        h.clock.advance(TimeDelta::hours(7));
        let found: Vec<FileRecord> = h.registry.search("report", 10).try_collect().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_relay_copy_then_record() {
        let h = harness();
        let token = h.registry.create(upload("a.pdf")).await.unwrap();
        let id = token.record_id().unwrap();
        let locator = h.registry.resolve(token.as_str()).await.unwrap().content_locator;

        h.registry.delete(&id).await.unwrap();
        assert!(!h.relay.contains(&locator));
        assert!(h.store.inner().is_empty());
        assert!(matches!(
            h.registry.resolve(token.as_str()).await,
            Err(RegistryError::LinkExpiredOrInvalid)
        ));
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let h = harness();
        let id = RecordId::generate();
        let err = h.registry.delete(&id).await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn delete_tolerates_relay_failure() {
        let h = harness();
        let token = h.registry.create(upload("a.pdf")).await.unwrap();
        h.relay.fail_deletes(true);
        h.registry.delete(&token.record_id().unwrap()).await.unwrap();
        assert!(h.store.inner().is_empty());
        assert_eq!(h.relay.len(), 1, "relay copy outlives metadata");
    }

    #[tokio::test]
    async fn delete_tolerates_relay_copy_already_gone() {
        let h = harness();
        let token = h.registry.create(upload("a.pdf")).await.unwrap();
        let record = h.registry.resolve(token.as_str()).await.unwrap();
        h.relay.lose(&record.content_locator);
        h.registry.delete(&record.id).await.unwrap();
        assert!(h.store.inner().is_empty());
    }

    #[tokio::test]
    async fn delete_surfaces_store_failure_after_removing_relay_copy() {
        let h = harness();
        let token = h.registry.create(upload("a.pdf")).await.unwrap();
        h.store.fail_deletes(true);
        let err = h
            .registry
            .delete(&token.record_id().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::StoreUnavailable(_)));
        // The relay copy goes first; the record stays behind for a retry.
        assert!(h.relay.is_empty());
        assert_eq!(h.store.inner().len(), 1);
    }

    #[tokio::test]
    async fn works_with_plain_memory_store() {
        let store = Arc::new(MemoryMetadataStore::new());
        let registry = FileRegistryBuilder::new()
            .store(store.clone())
            .relay(Arc::new(MemoryRelay::new()))
            .build()
            .unwrap();
        let token = registry.create(upload("a.pdf")).await.unwrap();
        assert!(registry.resolve(token.as_str()).await.is_ok());
        assert_eq!(store.len(), 1);
    }
}
