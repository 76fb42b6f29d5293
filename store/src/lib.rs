//! Record store interface and implementations for the identity engine.
//!
//! Provides a trait-based store over the three record kinds the engine
//! persists (identities, centroids, audit events), with an in-memory
//! implementation for testing and a redb-based implementation for
//! persistence.
//!
//! The trait's mutating operations are deliberately composite: an identity
//! is inserted together with its first centroid and its audit event in one
//! atomic step, so no backend can leave an identity behind without a
//! centroid.

pub mod memory;
pub mod records;
pub mod redb;

use thiserror::Error;

pub use memory::MemoryStore;
pub use records::{CentroidRecord, EventDraft, EventKind, EventRecord, IdentityRecord};
pub use redb::RedbStore;

/// Errors that can occur in record store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store: not found")]
    NotFound,

    #[error("store: duplicate identity id: {0}")]
    Duplicate(String),

    #[error("store: thumbnail already set")]
    ThumbnailSet,

    #[error("store: backend unavailable: {0}")]
    Unavailable(String),

    #[error("store: serialization error: {0}")]
    Serialization(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent record store contract.
///
/// Implementations must be safe for concurrent use and must fail in bounded
/// time: a backend that cannot serve a call returns
/// [`StoreError::Unavailable`] instead of blocking indefinitely.
///
/// Timestamps and event ids are assigned by the store at write time. Event
/// ids are monotonically increasing; events are never updated or deleted.
pub trait RecordStore: Send + Sync {
    /// Insert a new identity together with its first centroid
    /// (`sample_count = 1`, vector = first embedding) and the enrollment
    /// event, atomically. Returns the assigned event id.
    ///
    /// Fails with [`StoreError::Duplicate`] if the identity id is taken.
    fn insert_identity(
        &self,
        identity: &IdentityRecord,
        vector: &[f32],
        event: &EventDraft,
    ) -> StoreResult<u64>;

    /// Replace an existing centroid's vector and sample count and append the
    /// fold event, atomically. Returns the assigned event id.
    ///
    /// Fails with [`StoreError::NotFound`] if no centroid exists for the id.
    fn update_centroid(
        &self,
        identity_id: &str,
        vector: &[f32],
        sample_count: u32,
        event: &EventDraft,
    ) -> StoreResult<u64>;

    /// Append a standalone audit event. Returns the assigned event id.
    fn append_event(&self, event: &EventDraft) -> StoreResult<u64>;

    /// Fetch one identity by id.
    fn get_identity(&self, id: &str) -> StoreResult<Option<IdentityRecord>>;

    /// Return all identities whose id starts with the given prefix,
    /// ordered by id.
    fn identities_with_prefix(&self, prefix: &str) -> StoreResult<Vec<IdentityRecord>>;

    /// Fetch the centroid for one identity.
    fn get_centroid(&self, identity_id: &str) -> StoreResult<Option<CentroidRecord>>;

    /// Return every stored centroid.
    fn all_centroids(&self) -> StoreResult<Vec<CentroidRecord>>;

    /// Return the number of stored identities.
    fn identity_count(&self) -> StoreResult<usize>;

    /// Return audit events newest-first, bounded by `limit` when given.
    fn events(&self, limit: Option<usize>) -> StoreResult<Vec<EventRecord>>;

    /// Attach a thumbnail reference to an identity. The reference can be set
    /// exactly once; a second call fails with [`StoreError::ThumbnailSet`].
    fn set_thumbnail(&self, identity_id: &str, thumbnail_ref: &str) -> StoreResult<()>;
}

impl std::fmt::Debug for dyn RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordStore {{ ... }}")
    }
}
