use tracing::{debug, warn};

use ferry_core::FileRecord;
use ferry_relay::BlobRelay;

/// What happened to a record's relay copy during removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelayCleanup {
    Removed,
    AlreadyGone,
    Failed,
}

/// Delete the relay copy of `record`, logging instead of failing.
///
/// This always runs before the metadata delete: the record is the only key
/// to the locator, so it has to outlive the relay attempt.
pub(crate) async fn remove_relay_copy(relay: &dyn BlobRelay, record: &FileRecord) -> RelayCleanup {
    match relay.delete(&record.content_locator).await {
        Ok(()) => RelayCleanup::Removed,
        Err(e) if e.is_not_found() => {
            debug!(
                record_id = %record.id,
                locator = %record.content_locator,
                "relay copy already gone"
            );
            RelayCleanup::AlreadyGone
        }
        Err(e) => {
            warn!(
                record_id = %record.id,
                locator = %record.content_locator,
                error = %e,
                "failed to delete relay copy; leaving it orphaned"
            );
            RelayCleanup::Failed
        }
    }
}
