//! Background eviction of expired file records.
//!
//! The sweeper scans the metadata store for records whose `expires_at` has
//! passed and removes each one from the blob relay and then from the store.
//! Failures are logged and counted, never propagated: whatever a pass leaves
//! behind is still expired on the next pass and gets retried.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use ferry_core::{Clock, FileRecord};
use ferry_relay::BlobRelay;
use ferry_store::MetadataStore;

use crate::eviction::{RelayCleanup, remove_relay_copy};

/// Configuration for the [`Sweeper`].
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Pause between the end of one pass and the start of the next (default: 60 seconds).
    pub interval: Duration,
    /// Records evicted in parallel within a pass (default: 8).
    pub concurrency: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            concurrency: 8,
        }
    }
}

/// What the sweeper is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    /// Waiting for the next pass.
    Idle,
    /// A pass is in progress.
    Sweeping,
    /// Shut down; no further passes will run.
    Stopped,
}

/// Tally of a single sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Expired records the scan produced.
    pub scanned: usize,
    /// Records whose metadata this pass deleted.
    pub evicted: usize,
    /// Records whose metadata was already gone, usually through a concurrent
    /// administrative delete.
    pub already_gone: usize,
    /// Relay copies that could not be deleted and are now orphaned.
    pub relay_failures: usize,
    /// Records left in the store because the metadata delete failed.
    pub store_failures: usize,
    /// The scan itself errored, so the pass ended early.
    pub scan_failed: bool,
}

impl SweepReport {
    fn record(&mut self, eviction: Eviction) {
        self.scanned += 1;
        if eviction.relay == RelayCleanup::Failed {
            self.relay_failures += 1;
        }
        match eviction.store {
            StoreCleanup::Deleted => self.evicted += 1,
            StoreCleanup::AlreadyGone => self.already_gone += 1,
            StoreCleanup::Failed => self.store_failures += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreCleanup {
    Deleted,
    AlreadyGone,
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Eviction {
    relay: RelayCleanup,
    store: StoreCleanup,
}

async fn evict(store: &dyn MetadataStore, relay: &dyn BlobRelay, record: FileRecord) -> Eviction {
    let relay_outcome = remove_relay_copy(relay, &record).await;
    let store_outcome = match store.delete_by_id(&record.id).await {
        Ok(true) => StoreCleanup::Deleted,
        Ok(false) => StoreCleanup::AlreadyGone,
        Err(e) => {
            warn!(
                record_id = %record.id,
                error = %e,
                "failed to delete expired record; will retry next pass"
            );
            StoreCleanup::Failed
        }
    };
    Eviction {
        relay: relay_outcome,
        store: store_outcome,
    }
}

/// Periodic eviction task.
///
/// Create one through [`FileRegistry::sweeper`](crate::FileRegistry::sweeper)
/// and drive it with [`run`](Self::run) on its own task. Send on (or drop)
/// the paired shutdown sender to stop it.
pub struct Sweeper {
    config: SweeperConfig,
    store: Arc<dyn MetadataStore>,
    relay: Arc<dyn BlobRelay>,
    clock: Arc<dyn Clock>,
    shutdown_rx: mpsc::Receiver<()>,
    state_tx: watch::Sender<SweeperState>,
}

impl Sweeper {
    pub fn new(
        config: SweeperConfig,
        store: Arc<dyn MetadataStore>,
        relay: Arc<dyn BlobRelay>,
        clock: Arc<dyn Clock>,
        shutdown_rx: mpsc::Receiver<()>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SweeperState::Idle);
        Self {
            config,
            store,
            relay,
            clock,
            shutdown_rx,
            state_tx,
        }
    }

    /// Subscribe to state changes.
    pub fn state(&self) -> watch::Receiver<SweeperState> {
        self.state_tx.subscribe()
    }

    /// Run sweep passes until shutdown is signaled.
    ///
    /// The first pass starts immediately and each later one starts a full
    /// `interval` after the previous pass finished. A pass in progress always
    /// runs to completion; shutdown is only observed between passes.
    pub async fn run(&mut self) {
        info!(
            interval = ?self.config.interval,
            concurrency = self.config.concurrency,
            "sweeper starting"
        );

        let mut pause = Duration::ZERO;
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown_rx.recv() => {
                    info!("sweeper received shutdown signal");
                    break;
                }
                () = sleep(pause) => {}
            }

            self.state_tx.send_replace(SweeperState::Sweeping);
            let report = self.sweep_once().await;
            if report.scanned > 0 || report.scan_failed {
                info!(
                    scanned = report.scanned,
                    evicted = report.evicted,
                    already_gone = report.already_gone,
                    relay_failures = report.relay_failures,
                    store_failures = report.store_failures,
                    scan_failed = report.scan_failed,
                    "sweep pass complete"
                );
            } else {
                debug!("sweep pass found nothing to evict");
            }
            self.state_tx.send_replace(SweeperState::Idle);
            pause = self.config.interval;
        }

        self.state_tx.send_replace(SweeperState::Stopped);
        info!("sweeper stopped");
    }

    /// Run a single pass over every record expired as of now.
    ///
    /// Records are evicted concurrently up to the configured limit. A failed
    /// eviction never aborts the rest of the pass.
    pub async fn sweep_once(&self) -> SweepReport {
        let now = self.clock.now();
        let store = self.store.as_ref();
        let relay = self.relay.as_ref();
        let mut report = SweepReport::default();

        let mut outcomes = self
            .store
            .find_expired(now)
            .map(move |item| async move {
                match item {
                    Ok(record) => Ok(evict(store, relay, record).await),
                    Err(e) => Err(e),
                }
            })
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Ok(eviction) => report.record(eviction),
                Err(e) => {
                    error!(error = %e, "failed to scan for expired records");
                    report.scan_failed = true;
                }
            }
        }

        report
    }
}
