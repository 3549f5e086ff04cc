use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Placeholder rendered for descriptive metadata the source did not provide.
pub const UNKNOWN: &str = "unknown";

/// Length of the canonical textual form of a [`RecordId`].
const RECORD_ID_LEN: usize = 32;

/// Error returned when a string is not a well-formed [`RecordId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed record identifier: {0:?}")]
pub struct RecordIdError(pub String);

/// Store-assigned identifier of a [`FileRecord`].
///
/// Backed by a UUIDv7 so identifiers sort roughly by creation time. The
/// canonical textual form is 32 lowercase hex digits with no separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(Uuid);

impl RecordId {
    /// Mint a fresh, time-ordered identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = RecordIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != RECORD_ID_LEN || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RecordIdError(s.to_owned()));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| RecordIdError(s.to_owned()))
    }
}

impl TryFrom<String> for RecordId {
    type Error = RecordIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.to_string()
    }
}

/// Coordinates of a stored artifact inside the blob relay.
///
/// The relay treats these as opaque; for the Telegram relay they name the
/// log-channel message holding the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentLocator {
    /// Relay-side chat holding the copy.
    pub chat_id: i64,
    /// Relay-side message holding the copy.
    pub message_id: i64,
}

impl ContentLocator {
    #[must_use]
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.chat_id, self.message_id)
    }
}

/// A file record that has not been persisted yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFileRecord {
    pub owner_id: i64,
    pub owner_label: String,
    pub display_name: String,
    pub size_label: String,
    pub content_locator: ContentLocator,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewFileRecord {
    /// Start a record for content at `content_locator`, expiring exactly
    /// `retention` after `created_at`.
    ///
    /// Owner and descriptive fields start out as [`UNKNOWN`].
    #[must_use]
    pub fn new(
        content_locator: ContentLocator,
        created_at: DateTime<Utc>,
        retention: TimeDelta,
    ) -> Self {
        Self {
            owner_id: 0,
            owner_label: UNKNOWN.to_owned(),
            display_name: UNKNOWN.to_owned(),
            size_label: UNKNOWN.to_owned(),
            content_locator,
            created_at,
            expires_at: created_at + retention,
        }
    }

    /// Set the uploading actor.
    #[must_use]
    pub fn with_owner(mut self, owner_id: i64, owner_label: impl Into<String>) -> Self {
        self.owner_id = owner_id;
        self.owner_label = or_unknown(Some(owner_label.into()));
        self
    }

    /// Set the display name; blank or missing names render as [`UNKNOWN`].
    #[must_use]
    pub fn with_display_name(mut self, name: Option<String>) -> Self {
        self.display_name = or_unknown(name);
        self
    }

    /// Set the size label; blank or missing labels render as [`UNKNOWN`].
    #[must_use]
    pub fn with_size_label(mut self, label: Option<String>) -> Self {
        self.size_label = or_unknown(label);
        self
    }

    /// Attach the store-assigned id.
    #[must_use]
    pub fn into_record(self, id: RecordId) -> FileRecord {
        FileRecord {
            id,
            owner_id: self.owner_id,
            owner_label: self.owner_label,
            display_name: self.display_name,
            size_label: self.size_label,
            content_locator: self.content_locator,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

fn or_unknown(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN.to_owned(),
    }
}

/// Durable metadata describing one forwarded artifact.
///
/// Records are immutable once written. The only way to the bytes is
/// `content_locator`; the record never holds content itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: RecordId,
    pub owner_id: i64,
    pub owner_label: String,
    pub display_name: String,
    pub size_label: String,
    pub content_locator: ContentLocator,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether the record is eligible for eviction at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Case-insensitive substring match on the display name.
    #[must_use]
    pub fn name_matches(&self, needle: &str) -> bool {
        self.display_name
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}
