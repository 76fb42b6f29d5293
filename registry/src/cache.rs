//! Read-through centroid cache for recognition-loop collaborators.

use std::collections::HashMap;

use crate::error::RegistryError;
use crate::registry::Registry;

/// A collaborator-owned snapshot of the known centroids.
///
/// A recognition loop matching at frame rate should not hit the store on
/// every frame. It owns one of these, calls [`refresh`](Self::refresh)
/// before each batch of lookups, and reads [`centroids`](Self::centroids)
/// locally; the snapshot is re-fetched only when the registry's version
/// counter has moved since the last load.
#[derive(Debug, Default)]
pub struct CentroidCache {
    loaded_version: Option<u64>,
    centroids: HashMap<String, Vec<f32>>,
}

impl CentroidCache {
    /// Creates an empty cache. The first refresh always fetches.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-fetch the snapshot if the registry has enrolled anything since
    /// the last load. Returns true if the snapshot was reloaded.
    pub fn refresh(&mut self, registry: &Registry) -> Result<bool, RegistryError> {
        let version = registry.version();
        if self.loaded_version == Some(version) {
            return Ok(false);
        }
        self.centroids = registry.known_centroids()?;
        self.loaded_version = Some(version);
        Ok(true)
    }

    /// The cached snapshot. Empty until the first refresh.
    pub fn centroids(&self) -> &HashMap<String, Vec<f32>> {
        &self.centroids
    }

    /// Drop the snapshot so the next refresh re-fetches unconditionally.
    pub fn invalidate(&mut self) {
        self.loaded_version = None;
        self.centroids.clear();
    }
}
