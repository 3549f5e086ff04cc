use ferry_core::RecordId;

/// Key holding a record's JSON document: `prefix:file:id`.
pub fn record_key(prefix: &str, id: &str) -> String {
    format!("{prefix}:file:{id}")
}

/// Sorted set of record ids scored by `expires_at` in milliseconds.
pub fn expiry_index(prefix: &str) -> String {
    format!("{prefix}:expiry_index")
}

/// Sorted set of record ids scored by `created_at` in milliseconds.
pub fn created_index(prefix: &str) -> String {
    format!("{prefix}:created_index")
}

/// Index member for a record id.
pub fn member(id: &RecordId) -> String {
    id.to_string()
}
