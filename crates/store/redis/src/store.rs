use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_redis::{Config, Pool, Runtime};
use futures::stream::{self, StreamExt, TryStreamExt};
use redis::AsyncCommands;
use tracing::{debug, warn};

use ferry_core::{FileRecord, NewFileRecord, RecordId};
use ferry_store::error::StoreError;
use ferry_store::store::{MetadataStore, RecordStream};

use crate::config::RedisConfig;
use crate::key_render::{created_index, expiry_index, member, record_key};

/// Position of the last index entry a scan has yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexCursor {
    score: i64,
    member: String,
}

/// Walk order over a sorted-set index. Redis breaks score ties by member,
/// so `(score, member)` is a total order in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn is_past(self, entry: &IndexCursor, cursor: &IndexCursor) -> bool {
        let entry = (entry.score, entry.member.as_str());
        let cursor = (cursor.score, cursor.member.as_str());
        match self {
            Self::Ascending => entry > cursor,
            Self::Descending => entry < cursor,
        }
    }
}

/// Drop the entries a scan has already walked past.
fn entries_past(
    raw: Vec<(String, f64)>,
    direction: Direction,
    cursor: Option<&IndexCursor>,
) -> Vec<IndexCursor> {
    raw.into_iter()
        .map(|(member, score)| {
            #[allow(clippy::cast_possible_truncation)]
            let score = score as i64;
            IndexCursor { score, member }
        })
        .filter(|entry| cursor.is_none_or(|c| direction.is_past(entry, c)))
        .collect()
}

/// Redis-backed implementation of [`MetadataStore`].
///
/// Each record is a JSON string under `prefix:file:id`. Two sorted sets index
/// the collection: one scored by `expires_at` for the sweeper, one scored by
/// `created_at` for newest-first search. No Redis TTL is set on record keys;
/// records only disappear through [`MetadataStore::delete_by_id`].
pub struct RedisMetadataStore {
    pool: Pool,
    prefix: String,
    page_size: usize,
}

impl RedisMetadataStore {
    /// Create a new `RedisMetadataStore` from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if the pool cannot be created.
    pub fn new(config: &RedisConfig) -> Result<Self, StoreError> {
        let cfg = Config::from_url(&config.url);
        let pool = cfg
            .builder()
            .map(|b| {
                b.max_size(config.pool_size)
                    .wait_timeout(Some(config.connection_timeout))
                    .runtime(Runtime::Tokio1)
                    .build()
            })
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        Ok(Self {
            pool,
            prefix: config.prefix.clone(),
            page_size: config.page_size.max(1),
        })
    }

    /// Obtain a connection from the pool.
    async fn conn(&self) -> Result<deadpool_redis::Connection, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    /// Fetch the record documents for a page of index members.
    ///
    /// Members whose document is gone are dropped from both indexes.
    async fn load(&self, members: &[String]) -> Result<Vec<FileRecord>, StoreError> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = members
            .iter()
            .map(|m| record_key(&self.prefix, m))
            .collect();

        let mut conn = self.conn().await?;
        // Explicit MGET: a one-key `mget` would be sent as GET.
        let docs: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        let mut records = Vec::with_capacity(docs.len());
        let mut stale = Vec::new();
        for (m, doc) in members.iter().zip(docs) {
            match doc {
                Some(json) => records.push(
                    serde_json::from_str::<FileRecord>(&json)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?,
                ),
                None => stale.push(m.clone()),
            }
        }

        if !stale.is_empty() {
            debug!(count = stale.len(), "dropping stale index entries");
            let cleanup = redis::pipe()
                .zrem(expiry_index(&self.prefix), &stale)
                .ignore()
                .zrem(created_index(&self.prefix), &stale)
                .ignore()
                .exec_async(&mut conn)
                .await;
            if let Err(e) = cleanup {
                warn!(error = %e, "failed to drop stale index entries");
            }
        }

        Ok(records)
    }

    /// Fetch the next page of `index` strictly after `cursor`.
    ///
    /// The query restarts at the cursor's score, inclusive, so entries that
    /// share that score are neither skipped nor repeated however many there
    /// are. Returns the page and whether Redis filled it.
    async fn index_page(
        &self,
        index: &str,
        direction: Direction,
        upper_ms: Option<i64>,
        cursor: Option<&IndexCursor>,
    ) -> Result<(Vec<IndexCursor>, bool), StoreError> {
        let (command, from, to) = match direction {
            Direction::Ascending => (
                "ZRANGEBYSCORE",
                cursor.map_or_else(|| "-inf".to_owned(), |c| c.score.to_string()),
                upper_ms.map_or_else(|| "+inf".to_owned(), |ms| ms.to_string()),
            ),
            Direction::Descending => (
                "ZREVRANGEBYSCORE",
                cursor.map_or_else(|| "+inf".to_owned(), |c| c.score.to_string()),
                "-inf".to_owned(),
            ),
        };

        let mut conn = self.conn().await?;
        let mut offset = 0usize;
        loop {
            let raw: Vec<(String, f64)> = redis::cmd(command)
                .arg(index)
                .arg(&from)
                .arg(&to)
                .arg("WITHSCORES")
                .arg("LIMIT")
                .arg(offset)
                .arg(self.page_size)
                .query_async(&mut conn)
                .await
                .map_err(backend)?;
            let full = raw.len() == self.page_size;
            let page = entries_past(raw, direction, cursor);
            // A full page made only of entries already walked means more of
            // them share the cursor's score than fit in one page.
            if !page.is_empty() || !full {
                return Ok((page, full));
            }
            offset += self.page_size;
        }
    }

    /// Stream records in `index` order, a page at a time.
    fn scan_index(
        &self,
        index: String,
        direction: Direction,
        upper_ms: Option<i64>,
    ) -> RecordStream<'_> {
        stream::try_unfold(Some(None::<IndexCursor>), move |state| {
            let index = index.clone();
            async move {
                let Some(cursor) = state else {
                    return Ok::<_, StoreError>(None);
                };
                let (page, full) = self
                    .index_page(&index, direction, upper_ms, cursor.as_ref())
                    .await?;
                let next = if full { page.last().cloned().map(Some) } else { None };
                let members: Vec<String> = page.into_iter().map(|e| e.member).collect();
                let records = self.load(&members).await?;
                Ok(Some((ok_all(records), next)))
            }
        })
        .try_flatten()
        .boxed()
    }
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn ok_all(records: Vec<FileRecord>) -> impl futures::Stream<Item = Result<FileRecord, StoreError>> {
    stream::iter(records.into_iter().map(Ok::<FileRecord, StoreError>))
}

#[async_trait]
impl MetadataStore for RedisMetadataStore {
    async fn insert(&self, record: &NewFileRecord) -> Result<RecordId, StoreError> {
        let id = RecordId::generate();
        let record = record.clone().into_record(id);
        let json =
            serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let m = member(&id);

        let mut conn = self.conn().await?;
        redis::pipe()
            .atomic()
            .set(record_key(&self.prefix, &m), json)
            .ignore()
            .zadd(expiry_index(&self.prefix), &m, record.expires_at.timestamp_millis())
            .ignore()
            .zadd(created_index(&self.prefix), &m, record.created_at.timestamp_millis())
            .ignore()
            .exec_async(&mut conn)
            .await
            .map_err(backend)?;

        Ok(id)
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<FileRecord>, StoreError> {
        let mut conn = self.conn().await?;
        let doc: Option<String> = conn
            .get(record_key(&self.prefix, &member(id)))
            .await
            .map_err(backend)?;
        doc.map(|json| {
            serde_json::from_str(&json).map_err(|e| StoreError::Serialization(e.to_string()))
        })
        .transpose()
    }

    /// Pages through the expiry index on a `(score, member)` cursor.
    ///
    /// Records deleted while the stream is consumed, typically by the
    /// sweeper itself, never shift the cursor past records not yet yielded.
    fn find_expired(&self, now: DateTime<Utc>) -> RecordStream<'_> {
        self.scan_index(
            expiry_index(&self.prefix),
            Direction::Ascending,
            Some(now.timestamp_millis()),
        )
        // The index can lag a rewritten document; trust the document.
        .try_filter(move |r| futures::future::ready(r.is_expired_at(now)))
        .boxed()
    }

    /// Walks the creation index newest first on the same cursor as
    /// [`find_expired`](MetadataStore::find_expired), so concurrent evictions
    /// cannot make a search skip live matches.
    fn find_by_name<'a>(&'a self, needle: &'a str, limit: usize) -> RecordStream<'a> {
        if limit == 0 {
            return stream::empty().boxed();
        }
        self.scan_index(created_index(&self.prefix), Direction::Descending, None)
            .try_filter(move |r| futures::future::ready(r.name_matches(needle)))
            .take(limit)
            .boxed()
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        let m = member(id);
        let mut conn = self.conn().await?;
        let (deleted, _, _): (i64, i64, i64) = redis::pipe()
            .atomic()
            .del(record_key(&self.prefix, &m))
            .zrem(expiry_index(&self.prefix), &m)
            .zrem(created_index(&self.prefix), &m)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close();
        Ok(())
    }
}
