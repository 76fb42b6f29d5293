//! In-memory record store implementation for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::records::{CentroidRecord, EventDraft, EventRecord, IdentityRecord};
use crate::{RecordStore, StoreError, StoreResult};

/// An in-memory record store. Data is lost on restart; suitable for tests
/// and ephemeral deployments.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    identities: BTreeMap<String, IdentityRecord>,
    centroids: BTreeMap<String, CentroidRecord>,
    events: BTreeMap<u64, EventRecord>,
    next_event: u64,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl Inner {
    fn push_event(&mut self, draft: &EventDraft) -> u64 {
        self.next_event += 1;
        let id = self.next_event;
        self.events
            .insert(id, EventRecord::from_draft(draft, id, Utc::now()));
        id
    }
}

impl RecordStore for MemoryStore {
    fn insert_identity(
        &self,
        identity: &IdentityRecord,
        vector: &[f32],
        event: &EventDraft,
    ) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        if inner.identities.contains_key(&identity.id) {
            return Err(StoreError::Duplicate(identity.id.clone()));
        }
        inner
            .identities
            .insert(identity.id.clone(), identity.clone());
        inner.centroids.insert(
            identity.id.clone(),
            CentroidRecord {
                identity_id: identity.id.clone(),
                vector: vector.to_vec(),
                sample_count: 1,
                updated_at: Utc::now(),
            },
        );
        Ok(inner.push_event(event))
    }

    fn update_centroid(
        &self,
        identity_id: &str,
        vector: &[f32],
        sample_count: u32,
        event: &EventDraft,
    ) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        let centroid = inner
            .centroids
            .get_mut(identity_id)
            .ok_or(StoreError::NotFound)?;
        centroid.vector = vector.to_vec();
        centroid.sample_count = sample_count;
        centroid.updated_at = Utc::now();
        Ok(inner.push_event(event))
    }

    fn append_event(&self, event: &EventDraft) -> StoreResult<u64> {
        let mut inner = self.lock()?;
        Ok(inner.push_event(event))
    }

    fn get_identity(&self, id: &str) -> StoreResult<Option<IdentityRecord>> {
        let inner = self.lock()?;
        Ok(inner.identities.get(id).cloned())
    }

    fn identities_with_prefix(&self, prefix: &str) -> StoreResult<Vec<IdentityRecord>> {
        let inner = self.lock()?;
        Ok(inner
            .identities
            .range(prefix.to_string()..)
            .take_while(|(id, _)| id.starts_with(prefix))
            .map(|(_, rec)| rec.clone())
            .collect())
    }

    fn get_centroid(&self, identity_id: &str) -> StoreResult<Option<CentroidRecord>> {
        let inner = self.lock()?;
        Ok(inner.centroids.get(identity_id).cloned())
    }

    fn all_centroids(&self) -> StoreResult<Vec<CentroidRecord>> {
        let inner = self.lock()?;
        Ok(inner.centroids.values().cloned().collect())
    }

    fn identity_count(&self) -> StoreResult<usize> {
        let inner = self.lock()?;
        Ok(inner.identities.len())
    }

    fn events(&self, limit: Option<usize>) -> StoreResult<Vec<EventRecord>> {
        let inner = self.lock()?;
        let take = limit.unwrap_or(usize::MAX);
        Ok(inner.events.values().rev().take(take).cloned().collect())
    }

    fn set_thumbnail(&self, identity_id: &str, thumbnail_ref: &str) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let identity = inner
            .identities
            .get_mut(identity_id)
            .ok_or(StoreError::NotFound)?;
        if identity.thumbnail_ref.is_some() {
            return Err(StoreError::ThumbnailSet);
        }
        identity.thumbnail_ref = Some(thumbnail_ref.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EventKind;

    fn identity(id: &str, given: &str, family: &str) -> IdentityRecord {
        IdentityRecord {
            id: id.into(),
            given_name: given.into(),
            family_name: family.into(),
            thumbnail_ref: None,
        }
    }

    fn draft(kind: EventKind) -> EventDraft {
        EventDraft::new(None, kind, "test")
    }

    #[test]
    fn insert_creates_identity_and_centroid() {
        let store = MemoryStore::new();
        store
            .insert_identity(
                &identity("KmMin001", "Min", "Kim"),
                &[1.0, 0.0],
                &draft(EventKind::EnrollNew),
            )
            .unwrap();

        assert_eq!(store.identity_count().unwrap(), 1);
        let centroid = store.get_centroid("KmMin001").unwrap().unwrap();
        assert_eq!(centroid.vector, vec![1.0, 0.0]);
        assert_eq!(centroid.sample_count, 1);
    }

    #[test]
    fn insert_duplicate_rejected() {
        let store = MemoryStore::new();
        let rec = identity("KmMin001", "Min", "Kim");
        store
            .insert_identity(&rec, &[1.0], &draft(EventKind::EnrollNew))
            .unwrap();
        let err = store
            .insert_identity(&rec, &[1.0], &draft(EventKind::EnrollNew))
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        // Nothing extra was written.
        assert_eq!(store.identity_count().unwrap(), 1);
        assert_eq!(store.events(None).unwrap().len(), 1);
    }

    #[test]
    fn update_centroid_missing_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_centroid("ghost", &[1.0], 2, &draft(EventKind::EnrollUpdate))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn prefix_scan_orders_by_id() {
        let store = MemoryStore::new();
        for id in ["LeAnn002", "LeAnn001", "KmMin001"] {
            store
                .insert_identity(&identity(id, "x", "y"), &[0.0], &draft(EventKind::EnrollNew))
                .unwrap();
        }
        let hits = store.identities_with_prefix("LeAnn").unwrap();
        let ids: Vec<&str> = hits.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["LeAnn001", "LeAnn002"]);
    }

    #[test]
    fn events_newest_first_with_limit() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .append_event(&EventDraft::new(
                    None,
                    EventKind::VerifyUnknown,
                    format!("event {i}"),
                ))
                .unwrap();
        }
        let recent = store.events(Some(2)).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].detail, "event 4");
        assert_eq!(recent[1].detail, "event 3");
        assert!(recent[0].event_id > recent[1].event_id);
    }

    #[test]
    fn thumbnail_set_once() {
        let store = MemoryStore::new();
        store
            .insert_identity(
                &identity("KmMin001", "Min", "Kim"),
                &[1.0],
                &draft(EventKind::EnrollNew),
            )
            .unwrap();

        store.set_thumbnail("KmMin001", "images/min.jpg").unwrap();
        let err = store.set_thumbnail("KmMin001", "images/other.jpg").unwrap_err();
        assert!(matches!(err, StoreError::ThumbnailSet));

        let rec = store.get_identity("KmMin001").unwrap().unwrap();
        assert_eq!(rec.thumbnail_ref.as_deref(), Some("images/min.jpg"));
    }
}
