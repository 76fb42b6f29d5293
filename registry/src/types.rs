/// Controls registry behavior.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding dimension (e.g. 128 for SFace embeddings).
    pub dim: usize,

    /// Maximum Euclidean distance at which a probe matches a centroid.
    /// Default: 0.7.
    pub threshold: f32,

    /// Distance below which a verified sighting is folded back into the
    /// matched centroid. Independent of `threshold`. Default: 0.7.
    pub refine_threshold: f32,

    /// Whether verification refines centroids at all. Disable if centroid
    /// drift toward near-threshold impostors is a concern.
    pub refine_on_verify: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dim: 0,
            threshold: 0.7,
            refine_threshold: 0.7,
            refine_on_verify: true,
        }
    }
}

impl Config {
    pub(crate) fn with_defaults(mut self) -> Self {
        if self.threshold == 0.0 {
            self.threshold = 0.7;
        }
        if self.refine_threshold == 0.0 {
            self.refine_threshold = 0.7;
        }
        self
    }
}

/// Outcome of [`Registry::enroll`](crate::Registry::enroll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    /// The identity the embedding was folded into.
    pub identity_id: String,

    /// True iff a brand-new identity record was inserted.
    pub created: bool,
}

/// Outcome of [`Registry::verify`](crate::Registry::verify).
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    /// Matched identity, or None for an unregistered face.
    pub identity_id: Option<String>,

    /// Display name of the matched identity.
    pub given_name: Option<String>,

    /// Distance to the nearest centroid. None when no identities are
    /// enrolled yet.
    pub distance: Option<f32>,
}

impl Verification {
    pub fn is_match(&self) -> bool {
        self.identity_id.is_some()
    }
}
