//! Redb-based persistent record store implementation.
//!
//! Each trait call runs as a single redb transaction, so composite writes
//! (identity + centroid + event) commit or roll back as one unit and event
//! ids stay gap-free under concurrent writers.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::records::{CentroidRecord, EventDraft, EventRecord, IdentityRecord};
use crate::{RecordStore, StoreError, StoreResult};

const IDENTITY: TableDefinition<&str, &[u8]> = TableDefinition::new("identity");
const CENTROID: TableDefinition<&str, &[u8]> = TableDefinition::new("centroid");
const EVENT: TableDefinition<u64, &[u8]> = TableDefinition::new("event");

/// A persistent record store backed by redb.
pub struct RedbStore {
    db: Database,
}

fn backend_err<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    rmp_serde::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

impl RedbStore {
    /// Open or create a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = Database::create(path).map_err(backend_err)?;

        // Create the tables if they don't exist.
        let tx = db.begin_write().map_err(backend_err)?;
        {
            tx.open_table(IDENTITY).map_err(backend_err)?;
            tx.open_table(CENTROID).map_err(backend_err)?;
            tx.open_table(EVENT).map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)?;

        Ok(Self { db })
    }
}

/// Allocate the next event id and insert the materialized event.
/// Must run inside the caller's write transaction.
fn push_event(
    table: &mut redb::Table<'_, u64, &'static [u8]>,
    draft: &EventDraft,
) -> StoreResult<u64> {
    let last = match table.iter().map_err(backend_err)?.next_back() {
        Some(entry) => entry.map_err(backend_err)?.0.value(),
        None => 0,
    };
    let id = last + 1;
    let record = EventRecord::from_draft(draft, id, Utc::now());
    table
        .insert(id, encode(&record)?.as_slice())
        .map_err(backend_err)?;
    Ok(id)
}

impl RecordStore for RedbStore {
    fn insert_identity(
        &self,
        identity: &IdentityRecord,
        vector: &[f32],
        event: &EventDraft,
    ) -> StoreResult<u64> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        let event_id;
        {
            let mut identities = tx.open_table(IDENTITY).map_err(backend_err)?;
            if identities
                .get(identity.id.as_str())
                .map_err(backend_err)?
                .is_some()
            {
                return Err(StoreError::Duplicate(identity.id.clone()));
            }
            identities
                .insert(identity.id.as_str(), encode(identity)?.as_slice())
                .map_err(backend_err)?;

            let centroid = CentroidRecord {
                identity_id: identity.id.clone(),
                vector: vector.to_vec(),
                sample_count: 1,
                updated_at: Utc::now(),
            };
            let mut centroids = tx.open_table(CENTROID).map_err(backend_err)?;
            centroids
                .insert(identity.id.as_str(), encode(&centroid)?.as_slice())
                .map_err(backend_err)?;

            let mut events = tx.open_table(EVENT).map_err(backend_err)?;
            event_id = push_event(&mut events, event)?;
        }
        tx.commit().map_err(backend_err)?;
        Ok(event_id)
    }

    fn update_centroid(
        &self,
        identity_id: &str,
        vector: &[f32],
        sample_count: u32,
        event: &EventDraft,
    ) -> StoreResult<u64> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        let event_id;
        {
            let mut centroids = tx.open_table(CENTROID).map_err(backend_err)?;
            if centroids.get(identity_id).map_err(backend_err)?.is_none() {
                return Err(StoreError::NotFound);
            }
            let centroid = CentroidRecord {
                identity_id: identity_id.to_string(),
                vector: vector.to_vec(),
                sample_count,
                updated_at: Utc::now(),
            };
            centroids
                .insert(identity_id, encode(&centroid)?.as_slice())
                .map_err(backend_err)?;

            let mut events = tx.open_table(EVENT).map_err(backend_err)?;
            event_id = push_event(&mut events, event)?;
        }
        tx.commit().map_err(backend_err)?;
        Ok(event_id)
    }

    fn append_event(&self, event: &EventDraft) -> StoreResult<u64> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        let event_id;
        {
            let mut events = tx.open_table(EVENT).map_err(backend_err)?;
            event_id = push_event(&mut events, event)?;
        }
        tx.commit().map_err(backend_err)?;
        Ok(event_id)
    }

    fn get_identity(&self, id: &str) -> StoreResult<Option<IdentityRecord>> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(IDENTITY).map_err(backend_err)?;
        match table.get(id).map_err(backend_err)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn identities_with_prefix(&self, prefix: &str) -> StoreResult<Vec<IdentityRecord>> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(IDENTITY).map_err(backend_err)?;

        let mut results = Vec::new();
        for item in table.iter().map_err(backend_err)? {
            let (key, value) = item.map_err(backend_err)?;
            if key.value().starts_with(prefix) {
                results.push(decode(value.value())?);
            }
        }
        Ok(results)
    }

    fn get_centroid(&self, identity_id: &str) -> StoreResult<Option<CentroidRecord>> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(CENTROID).map_err(backend_err)?;
        match table.get(identity_id).map_err(backend_err)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn all_centroids(&self) -> StoreResult<Vec<CentroidRecord>> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(CENTROID).map_err(backend_err)?;

        let mut results = Vec::new();
        for item in table.iter().map_err(backend_err)? {
            let (_, value) = item.map_err(backend_err)?;
            results.push(decode(value.value())?);
        }
        Ok(results)
    }

    fn identity_count(&self) -> StoreResult<usize> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(IDENTITY).map_err(backend_err)?;
        Ok(table.len().map_err(backend_err)? as usize)
    }

    fn events(&self, limit: Option<usize>) -> StoreResult<Vec<EventRecord>> {
        let tx = self.db.begin_read().map_err(backend_err)?;
        let table = tx.open_table(EVENT).map_err(backend_err)?;

        let take = limit.unwrap_or(usize::MAX);
        let mut results = Vec::new();
        for item in table.iter().map_err(backend_err)?.rev().take(take) {
            let (_, value) = item.map_err(backend_err)?;
            results.push(decode(value.value())?);
        }
        Ok(results)
    }

    fn set_thumbnail(&self, identity_id: &str, thumbnail_ref: &str) -> StoreResult<()> {
        let tx = self.db.begin_write().map_err(backend_err)?;
        {
            let mut table = tx.open_table(IDENTITY).map_err(backend_err)?;
            let mut record: IdentityRecord = match table.get(identity_id).map_err(backend_err)? {
                Some(value) => decode(value.value())?,
                None => return Err(StoreError::NotFound),
            };
            if record.thumbnail_ref.is_some() {
                return Err(StoreError::ThumbnailSet);
            }
            record.thumbnail_ref = Some(thumbnail_ref.to_string());
            table
                .insert(identity_id, encode(&record)?.as_slice())
                .map_err(backend_err)?;
        }
        tx.commit().map_err(backend_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EventKind;
    use tempfile::tempdir;

    fn open_store(dir: &tempfile::TempDir) -> RedbStore {
        RedbStore::open(dir.path().join("facegate.redb")).unwrap()
    }

    fn identity(id: &str) -> IdentityRecord {
        IdentityRecord {
            id: id.into(),
            given_name: "Min".into(),
            family_name: "Kim".into(),
            thumbnail_ref: None,
        }
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let vector = vec![0.25f32, -0.5, 0.125];
        store
            .insert_identity(
                &identity("KmMin001"),
                &vector,
                &EventDraft::new(Some("KmMin001"), EventKind::EnrollNew, "enrolled Min"),
            )
            .unwrap();

        let got = store.get_identity("KmMin001").unwrap().unwrap();
        assert_eq!(got.given_name, "Min");

        let centroid = store.get_centroid("KmMin001").unwrap().unwrap();
        assert_eq!(centroid.vector, vector);
        assert_eq!(centroid.sample_count, 1);
    }

    #[test]
    fn duplicate_insert_leaves_no_partial_state() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let draft = EventDraft::new(Some("KmMin001"), EventKind::EnrollNew, "enrolled Min");
        store
            .insert_identity(&identity("KmMin001"), &[1.0], &draft)
            .unwrap();
        let err = store
            .insert_identity(&identity("KmMin001"), &[2.0], &draft)
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        // The failed insert appended no event and did not touch the centroid.
        assert_eq!(store.events(None).unwrap().len(), 1);
        let centroid = store.get_centroid("KmMin001").unwrap().unwrap();
        assert_eq!(centroid.vector, vec![1.0]);
    }

    #[test]
    fn event_ids_are_monotonic_and_newest_first() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        for i in 0..4 {
            store
                .append_event(&EventDraft::new(
                    None,
                    EventKind::VerifyUnknown,
                    format!("attempt {i}"),
                ))
                .unwrap();
        }

        let events = store.events(None).unwrap();
        assert_eq!(events.len(), 4);
        let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);

        let recent = store.events(Some(2)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].event_id, 4);
    }

    #[test]
    fn reopen_preserves_records_and_event_sequence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("facegate.redb");

        {
            let store = RedbStore::open(&path).unwrap();
            store
                .insert_identity(
                    &identity("KmMin001"),
                    &[0.1, 0.2],
                    &EventDraft::new(Some("KmMin001"), EventKind::EnrollNew, "enrolled Min"),
                )
                .unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.identity_count().unwrap(), 1);
        let centroid = store.get_centroid("KmMin001").unwrap().unwrap();
        assert_eq!(centroid.vector, vec![0.1, 0.2]);

        // Event ids continue after the last persisted one.
        let id = store
            .append_event(&EventDraft::new(None, EventKind::VerifyUnknown, "x"))
            .unwrap();
        assert_eq!(id, 2);
    }

    #[test]
    fn update_centroid_requires_existing_row() {
        let dir = tempdir().unwrap();
        let store = open_store(&dir);

        let err = store
            .update_centroid(
                "ghost",
                &[1.0],
                2,
                &EventDraft::new(Some("ghost"), EventKind::EnrollUpdate, "x"),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
        assert!(store.events(None).unwrap().is_empty());
    }
}
