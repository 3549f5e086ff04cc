use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use futures::TryStreamExt;

use ferry_core::{ContentLocator, FileRecord, NewFileRecord, RecordId};

use crate::error::StoreError;
use crate::store::MetadataStore;

fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn sample(name: &str, created_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> NewFileRecord {
    let mut record = NewFileRecord::new(ContentLocator::new(-100, 1), created_at, TimeDelta::zero())
        .with_owner(42, "tester")
        .with_display_name(Some(name.to_owned()))
        .with_size_label(Some("1.0 MB".to_owned()));
    record.expires_at = expires_at;
    record
}

/// A record that will not expire during any of the conformance checks.
fn long_lived(name: &str, created_at: DateTime<Utc>) -> NewFileRecord {
    sample(name, created_at, at(2099, 1, 1))
}

fn names(records: &[FileRecord]) -> Vec<&str> {
    records.iter().map(|r| r.display_name.as_str()).collect()
}

/// Run the full metadata store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if the backend fails an operation outright; behavioural
/// mismatches panic with a descriptive message.
pub async fn run_store_conformance_tests(store: &dyn MetadataStore) -> Result<(), StoreError> {
    test_find_missing(store).await?;
    test_insert_and_find(store).await?;
    test_delete(store).await?;
    test_find_expired(store).await?;
    test_find_by_name(store).await?;
    test_deleted_records_disappear(store).await?;
    Ok(())
}

async fn test_find_missing(store: &dyn MetadataStore) -> Result<(), StoreError> {
    let found = store.find_by_id(&RecordId::generate()).await?;
    assert!(found.is_none(), "find on unknown id should return None");
    Ok(())
}

async fn test_insert_and_find(store: &dyn MetadataStore) -> Result<(), StoreError> {
    let new = long_lived("insert-and-find.bin", at(2030, 1, 1));
    let id = store.insert(&new).await?;
    let found = store.find_by_id(&id).await?;
    assert_eq!(found, Some(new.into_record(id)), "stored record should read back");

    let other = store.insert(&long_lived("second.bin", at(2030, 1, 2))).await?;
    assert_ne!(id, other, "store must assign distinct ids");
    Ok(())
}

async fn test_delete(store: &dyn MetadataStore) -> Result<(), StoreError> {
    let id = store
        .insert(&long_lived("to-delete.bin", at(2030, 2, 1)))
        .await?;
    assert!(store.delete_by_id(&id).await?, "delete should report existing record");
    assert!(store.find_by_id(&id).await?.is_none(), "deleted record is gone");
    assert!(
        !store.delete_by_id(&id).await?,
        "second delete should report missing record"
    );
    Ok(())
}

async fn test_find_expired(store: &dyn MetadataStore) -> Result<(), StoreError> {
    let now = at(2001, 1, 1);
    let older = store
        .insert(&sample("expired-older.bin", at(2000, 1, 1), at(2000, 6, 1)))
        .await?;
    let boundary = store
        .insert(&sample("expired-boundary.bin", at(2000, 7, 1), now))
        .await?;
    let live = store
        .insert(&sample("still-live.bin", at(2000, 8, 1), at(2001, 6, 1)))
        .await?;

    let expired: Vec<FileRecord> = store.find_expired(now).try_collect().await?;
    let ids: Vec<RecordId> = expired.iter().map(|r| r.id).collect();
    assert_eq!(
        ids,
        vec![older, boundary],
        "expired records in expiry order, boundary inclusive"
    );
    assert!(!ids.contains(&live), "unexpired record must not be listed");
    Ok(())
}

async fn test_find_by_name(store: &dyn MetadataStore) -> Result<(), StoreError> {
    store
        .insert(&long_lived("Report_Final.pdf", at(2030, 3, 1)))
        .await?;
    store
        .insert(&long_lived("final_cut.mp4", at(2030, 3, 2)))
        .await?;
    store.insert(&long_lived("notes.txt", at(2030, 3, 3))).await?;

    let found: Vec<FileRecord> = store.find_by_name("FINAL", 10).try_collect().await?;
    assert_eq!(
        names(&found),
        vec!["final_cut.mp4", "Report_Final.pdf"],
        "case-insensitive substring, newest first"
    );

    let capped: Vec<FileRecord> = store.find_by_name("final", 1).try_collect().await?;
    assert_eq!(names(&capped), vec!["final_cut.mp4"], "limit must be honoured");

    let none: Vec<FileRecord> = store
        .find_by_name("no-such-file", 10)
        .try_collect()
        .await?;
    assert!(none.is_empty(), "no match is an empty result");
    Ok(())
}

async fn test_deleted_records_disappear(store: &dyn MetadataStore) -> Result<(), StoreError> {
    let id = store
        .insert(&sample("vanishing-draft.doc", at(1999, 1, 1), at(1999, 2, 1)))
        .await?;
    store.delete_by_id(&id).await?;

    let expired: Vec<FileRecord> = store.find_expired(at(2001, 1, 1)).try_collect().await?;
    assert!(
        expired.iter().all(|r| r.id != id),
        "deleted record must not be listed as expired"
    );
    let found: Vec<FileRecord> = store
        .find_by_name("vanishing", 10)
        .try_collect()
        .await?;
    assert!(found.is_empty(), "deleted record must not be searchable");
    Ok(())
}
