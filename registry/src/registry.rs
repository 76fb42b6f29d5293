use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use facegate_store::{
    CentroidRecord, EventDraft, EventKind, EventRecord, IdentityRecord, MemoryStore, RecordStore,
    StoreError,
};

use crate::allocator::{self, Allocation, ExactNameMatch, SamePersonPolicy};
use crate::centroid::fold_mean;
use crate::error::RegistryError;
use crate::matcher::{self, MatchOutcome};
use crate::types::{Config, Enrollment, Verification};

/// Number of fold-lock stripes. Folds on distinct identities proceed
/// concurrently unless they hash to the same stripe.
const FOLD_STRIPES: usize = 16;

/// Identity enrollment and verification engine.
///
/// Owns the mapping from embeddings to identities: allocates stable ids,
/// maintains one running-mean centroid per identity, matches probes against
/// the centroid set, and appends every decision to the audit trail.
///
/// Thread-safe: all methods can be called concurrently. The registry owns
/// no threads of its own; all work happens on caller threads.
pub struct Registry {
    cfg: Config,
    store: Arc<dyn RecordStore>,
    policy: Box<dyn SamePersonPolicy>,

    // Serializes the allocator's count-then-insert sequence.
    enroll_lock: Mutex<()>,
    // Per-identity exclusivity for centroid folds.
    fold_locks: [Mutex<()>; FOLD_STRIPES],

    version: AtomicU64,
}

impl Registry {
    /// Creates a new Registry with the default same-person policy
    /// (exact full-name match). Panics if `cfg.dim` is 0.
    pub fn new(cfg: Config, store: Arc<dyn RecordStore>) -> Self {
        Self::with_policy(cfg, store, Box::new(ExactNameMatch))
    }

    /// Creates a new Registry with a custom same-person policy.
    pub fn with_policy(
        cfg: Config,
        store: Arc<dyn RecordStore>,
        policy: Box<dyn SamePersonPolicy>,
    ) -> Self {
        assert!(cfg.dim > 0, "registry: Config.dim must be positive");
        Self {
            cfg: cfg.with_defaults(),
            store,
            policy,
            enroll_lock: Mutex::new(()),
            fold_locks: std::array::from_fn(|_| Mutex::new(())),
            version: AtomicU64::new(0),
        }
    }

    /// Creates a new Registry over an in-memory store.
    pub fn with_memory_store(cfg: Config) -> Self {
        Self::new(cfg, Arc::new(MemoryStore::new()))
    }

    /// Enroll an embedding under a name.
    ///
    /// Resolves the name to an identifier, folds the embedding into that
    /// identity's centroid (creating identity and centroid together on
    /// first sight), and appends one audit event. `created` is true iff a
    /// brand-new identity record was inserted.
    pub fn enroll(
        &self,
        given_name: &str,
        family_name: &str,
        embedding: &[f32],
    ) -> Result<Enrollment, RegistryError> {
        self.check_dim(embedding)?;

        let _guard = self.lock(&self.enroll_lock)?;

        // One retry: a concurrent writer on a shared store may take the
        // suffix between our count and our insert.
        let mut conflicted = false;
        loop {
            match allocator::allocate(self.store.as_ref(), self.policy.as_ref(), given_name, family_name)? {
                Allocation::New(id) => {
                    let identity = IdentityRecord {
                        id: id.clone(),
                        given_name: given_name.to_string(),
                        family_name: family_name.to_string(),
                        thumbnail_ref: None,
                    };
                    let event = EventDraft::new(
                        Some(&id),
                        EventKind::EnrollNew,
                        format!("new identity {given_name} {family_name} registered as {id}"),
                    );
                    match self.store.insert_identity(&identity, embedding, &event) {
                        Ok(_) => {
                            self.version.fetch_add(1, Ordering::Release);
                            info!(id = %id, "enrolled new identity");
                            return Ok(Enrollment {
                                identity_id: id,
                                created: true,
                            });
                        }
                        Err(StoreError::Duplicate(_)) if !conflicted => {
                            conflicted = true;
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Allocation::Existing(id) => {
                    let sample_count = self.fold(&id, embedding, |n| {
                        EventDraft::new(
                            Some(&id),
                            EventKind::EnrollUpdate,
                            format!("embedding folded into {id} (sample {n})"),
                        )
                    })?;
                    self.version.fetch_add(1, Ordering::Release);
                    debug!(id = %id, sample_count, "folded embedding into existing identity");
                    return Ok(Enrollment {
                        identity_id: id,
                        created: false,
                    });
                }
            }
        }
    }

    /// Verify a probe embedding against every known centroid.
    ///
    /// Appends exactly one audit event per call. When the match distance is
    /// below the refinement bound (and refinement is enabled), the probe is
    /// folded into the matched centroid in the same store transaction as the
    /// event, so a verified sighting also sharpens its reference vector.
    pub fn verify(&self, embedding: &[f32]) -> Result<Verification, RegistryError> {
        self.check_dim(embedding)?;

        let centroids = self.store.all_centroids()?;
        match matcher::match_probe(embedding, &centroids, self.cfg.threshold) {
            MatchOutcome::Match {
                identity_id,
                distance,
            } => {
                let given_name = self
                    .store
                    .get_identity(&identity_id)?
                    .map(|rec| rec.given_name);
                let display = given_name.as_deref().unwrap_or(identity_id.as_str());
                let event = EventDraft::new(
                    Some(&identity_id),
                    EventKind::VerifyMatch,
                    format!("{display} verified at distance {distance:.3}"),
                );

                if self.cfg.refine_on_verify && distance < self.cfg.refine_threshold {
                    self.fold(&identity_id, embedding, |_| event.clone())?;
                    debug!(id = %identity_id, distance, "verified and refined centroid");
                } else {
                    self.store.append_event(&event)?;
                    debug!(id = %identity_id, distance, "verified");
                }

                Ok(Verification {
                    identity_id: Some(identity_id),
                    given_name,
                    distance: Some(distance),
                })
            }
            MatchOutcome::Unknown { distance } => {
                self.store.append_event(&EventDraft::new(
                    None,
                    EventKind::VerifyUnknown,
                    "unregistered face attempted verification",
                ))?;
                debug!(?distance, "probe matched nobody");
                Ok(Verification {
                    identity_id: None,
                    given_name: None,
                    distance,
                })
            }
        }
    }

    /// Read-only snapshot of every known centroid vector, keyed by
    /// identity id. Intended for bulk load by a recognition loop; pair with
    /// [`version`](Self::version) to know when to re-fetch.
    pub fn known_centroids(&self) -> Result<HashMap<String, Vec<f32>>, RegistryError> {
        let centroids = self.store.all_centroids()?;
        Ok(centroids
            .into_iter()
            .map(|c| (c.identity_id, c.vector))
            .collect())
    }

    /// Fetch one identity's centroid record.
    pub fn centroid_of(&self, identity_id: &str) -> Result<Option<CentroidRecord>, RegistryError> {
        Ok(self.store.get_centroid(identity_id)?)
    }

    /// Fetch one identity record.
    pub fn identity(&self, identity_id: &str) -> Result<Option<IdentityRecord>, RegistryError> {
        Ok(self.store.get_identity(identity_id)?)
    }

    /// Number of enrolled identities.
    pub fn identity_count(&self) -> Result<usize, RegistryError> {
        Ok(self.store.identity_count()?)
    }

    /// Full audit trail, newest first.
    pub fn history(&self) -> Result<Vec<EventRecord>, RegistryError> {
        Ok(self.store.events(None)?)
    }

    /// The `n` most recent audit events, newest first.
    pub fn recent(&self, n: usize) -> Result<Vec<EventRecord>, RegistryError> {
        Ok(self.store.events(Some(n))?)
    }

    /// Attach a thumbnail reference to a freshly enrolled identity.
    /// The reference can be set exactly once.
    pub fn set_thumbnail(
        &self,
        identity_id: &str,
        thumbnail_ref: &str,
    ) -> Result<(), RegistryError> {
        match self.store.set_thumbnail(identity_id, thumbnail_ref) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => Err(RegistryError::NotFound(identity_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Monotonic counter bumped by every successful enrollment (including
    /// folds into existing identities). Collaborators caching
    /// [`known_centroids`](Self::known_centroids) re-fetch when it moves.
    ///
    /// Process-local; restarts reset it.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Fold an embedding into an existing centroid under the identity's
    /// fold lock. `event` receives the new sample count and the update
    /// commits atomically with the produced event. Returns the new count.
    fn fold(
        &self,
        identity_id: &str,
        embedding: &[f32],
        event: impl FnOnce(u32) -> EventDraft,
    ) -> Result<u32, RegistryError> {
        let _guard = self.lock(&self.fold_locks[stripe_of(identity_id)])?;

        let centroid = self.store.get_centroid(identity_id)?.ok_or_else(|| {
            // Allocator and accumulator disagree about this id; surface it,
            // never retry.
            warn!(id = %identity_id, "centroid missing for known identity");
            RegistryError::NotFound(identity_id.to_string())
        })?;

        let mut vector = centroid.vector;
        fold_mean(&mut vector, centroid.sample_count, embedding);
        let sample_count = centroid.sample_count + 1;
        self.store
            .update_centroid(identity_id, &vector, sample_count, &event(sample_count))?;
        Ok(sample_count)
    }

    fn check_dim(&self, embedding: &[f32]) -> Result<(), RegistryError> {
        if embedding.len() != self.cfg.dim {
            return Err(RegistryError::DimensionMismatch {
                expected: self.cfg.dim,
                got: embedding.len(),
            });
        }
        Ok(())
    }

    fn lock<'a>(&self, m: &'a Mutex<()>) -> Result<MutexGuard<'a, ()>, RegistryError> {
        m.lock()
            .map_err(|e| RegistryError::Store(StoreError::Unavailable(e.to_string())))
    }
}

fn stripe_of(identity_id: &str) -> usize {
    let mut hasher = DefaultHasher::new();
    identity_id.hash(&mut hasher);
    (hasher.finish() as usize) % FOLD_STRIPES
}
