//! Identity enrollment and verification over face embeddings.
//!
//! The registry owns the mapping from embeddings to identities: it derives
//! stable human-decodable ids from names, keeps one running-mean centroid
//! per identity, matches probe embeddings against the centroid set, and
//! appends every decision to an append-only audit trail. Producing the
//! embeddings (camera, detection, the recognition network) is the caller's
//! business; the registry only ever sees fixed-length vectors.
//!
//! # Usage
//!
//! ```
//! use facegate_registry::{Config, Registry};
//!
//! # fn main() -> Result<(), facegate_registry::RegistryError> {
//! let reg = Registry::with_memory_store(Config { dim: 3, ..Config::default() });
//!
//! // Enrollment: same full name folds into the same identity.
//! let e = reg.enroll("Min", "Kim", &[1.0, 0.0, 0.0])?;
//! assert!(e.created);
//!
//! // Verification: nearest centroid within the threshold.
//! let v = reg.verify(&[1.0, 0.0, 0.05])?;
//! assert_eq!(v.identity_id.as_deref(), Some(e.identity_id.as_str()));
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//!
//! A verified sighting whose distance clears the refinement bound is folded
//! back into its centroid, so recognition sharpens the reference vectors
//! over time. Set [`Config::refine_on_verify`] to `false` to keep
//! verification strictly read-only with respect to centroids.

mod allocator;
mod cache;
mod centroid;
mod error;
mod matcher;
mod registry;
mod types;

pub use allocator::{Allocation, ExactNameMatch, MAX_SUFFIX, SamePersonPolicy, allocate, name_base};
pub use cache::CentroidCache;
pub use error::RegistryError;
pub use matcher::{MatchOutcome, match_probe};
pub use registry::Registry;
pub use types::{Config, Enrollment, Verification};

pub use facegate_store::{
    CentroidRecord, EventKind, EventRecord, IdentityRecord, MemoryStore, RecordStore, RedbStore,
    StoreError,
};
