use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use ferry_core::ContentLocator;

use crate::error::RelayError;
use crate::relay::BlobRelay;
use crate::types::ContentSource;

/// Chat id the in-memory relay files its copies under.
pub const MEMORY_RELAY_CHAT: i64 = -1_000_000;

/// A delivery made through [`MemoryRelay::forward`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub locator: ContentLocator,
    pub destination_chat: i64,
    pub caption: Option<String>,
}

/// In-process [`BlobRelay`] that tracks copies in a [`DashMap`].
///
/// Each operation can be switched into a failing mode to exercise the
/// registry's partial-failure handling.
#[derive(Debug)]
pub struct MemoryRelay {
    copies: DashMap<ContentLocator, ContentSource>,
    next_message_id: AtomicI64,
    deliveries: Mutex<Vec<Delivery>>,
    delete_calls: AtomicUsize,
    fail_store: AtomicBool,
    fail_forward: AtomicBool,
    fail_delete: AtomicBool,
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self {
            copies: DashMap::new(),
            next_message_id: AtomicI64::new(1),
            deliveries: Mutex::new(Vec::new()),
            delete_calls: AtomicUsize::new(0),
            fail_store: AtomicBool::new(false),
            fail_forward: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `store` call fail with [`RelayError::Unavailable`].
    pub fn fail_stores(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }

    /// Make every `forward` call fail with [`RelayError::Unavailable`].
    pub fn fail_forwards(&self, fail: bool) {
        self.fail_forward.store(fail, Ordering::SeqCst);
    }

    /// Make every `delete` call fail with [`RelayError::Unavailable`].
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Drop a copy behind the registry's back, as an operator might.
    pub fn lose(&self, locator: &ContentLocator) -> bool {
        self.copies.remove(locator).is_some()
    }

    pub fn contains(&self, locator: &ContentLocator) -> bool {
        self.copies.contains_key(locator)
    }

    /// Number of copies currently held.
    pub fn len(&self) -> usize {
        self.copies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    /// How many times `delete` was called, successful or not.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Deliveries made so far, oldest first.
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }
}

#[async_trait]
impl BlobRelay for MemoryRelay {
    async fn store(&self, source: &ContentSource) -> Result<ContentLocator, RelayError> {
        if self.fail_store.load(Ordering::SeqCst) {
            return Err(RelayError::Unavailable("memory relay store disabled".into()));
        }
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        let locator = ContentLocator::new(MEMORY_RELAY_CHAT, message_id);
        self.copies.insert(locator, *source);
        debug!(%source, %locator, "memory relay stored copy");
        Ok(locator)
    }

    async fn forward(
        &self,
        locator: &ContentLocator,
        destination_chat: i64,
        caption: Option<&str>,
    ) -> Result<(), RelayError> {
        if self.fail_forward.load(Ordering::SeqCst) {
            return Err(RelayError::Unavailable("memory relay forward disabled".into()));
        }
        if !self.copies.contains_key(locator) {
            return Err(RelayError::NotFound(locator.to_string()));
        }
        self.deliveries.lock().await.push(Delivery {
            locator: *locator,
            destination_chat,
            caption: caption.map(str::to_owned),
        });
        Ok(())
    }

    async fn delete(&self, locator: &ContentLocator) -> Result<(), RelayError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(RelayError::Unavailable("memory relay delete disabled".into()));
        }
        match self.copies.remove(locator) {
            Some(_) => Ok(()),
            None => Err(RelayError::NotFound(locator.to_string())),
        }
    }
}
