//! Persisted record types.
//!
//! Records are msgpack-encoded with short field tags. Msgpack stores `f32`
//! values bit-exact, so centroid vectors round-trip without loss.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One real person known to the system.
///
/// Immutable after insert except `thumbnail_ref`, which is settable once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityRecord {
    /// Stable short identifier, e.g. "KmMin001".
    pub id: String,

    #[serde(rename = "given")]
    pub given_name: String,

    #[serde(rename = "family")]
    pub family_name: String,

    /// Opaque reference to a representative image.
    #[serde(rename = "thumb", default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_ref: Option<String>,
}

/// The reference embedding for one identity: the running mean of every
/// embedding folded into it, plus the fold count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidRecord {
    #[serde(rename = "id")]
    pub identity_id: String,

    #[serde(rename = "vec")]
    pub vector: Vec<f32>,

    #[serde(rename = "n")]
    pub sample_count: u32,

    #[serde(rename = "at")]
    pub updated_at: DateTime<Utc>,
}

/// What an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A brand-new identity was enrolled.
    #[serde(rename = "enroll_new")]
    EnrollNew,
    /// A fresh embedding was folded into an existing identity.
    #[serde(rename = "enroll_update")]
    EnrollUpdate,
    /// A probe matched a known identity.
    #[serde(rename = "verify_match")]
    VerifyMatch,
    /// A probe matched nobody.
    #[serde(rename = "verify_unknown")]
    VerifyUnknown,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EnrollNew => f.write_str("enroll_new"),
            Self::EnrollUpdate => f.write_str("enroll_update"),
            Self::VerifyMatch => f.write_str("verify_match"),
            Self::VerifyUnknown => f.write_str("verify_unknown"),
        }
    }
}

/// An audit event as handed to the store. The store assigns the id and
/// timestamp on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    /// None for unregistered verification attempts.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,

    pub kind: EventKind,

    pub detail: String,
}

impl EventDraft {
    pub fn new(identity_id: Option<&str>, kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            identity_id: identity_id.map(str::to_string),
            kind,
            detail: detail.into(),
        }
    }
}

/// A stored audit event. Append-only; never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "eid")]
    pub event_id: u64,

    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub identity_id: Option<String>,

    pub kind: EventKind,

    pub detail: String,

    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
}

impl EventRecord {
    /// Materialize a draft with a store-assigned id and timestamp.
    pub fn from_draft(draft: &EventDraft, event_id: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            event_id,
            identity_id: draft.identity_id.clone(),
            kind: draft.kind,
            detail: draft.detail.clone(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_display() {
        assert_eq!(EventKind::EnrollNew.to_string(), "enroll_new");
        assert_eq!(EventKind::VerifyUnknown.to_string(), "verify_unknown");
    }

    #[test]
    fn centroid_vector_msgpack_roundtrip() {
        let rec = CentroidRecord {
            identity_id: "KmMin001".into(),
            vector: vec![0.1, -0.25, 1.0e-7, 123.456],
            sample_count: 3,
            updated_at: Utc::now(),
        };
        let bytes = rmp_serde::to_vec_named(&rec).unwrap();
        let back: CentroidRecord = rmp_serde::from_slice(&bytes).unwrap();
        // Bit-for-bit: msgpack carries f32 unchanged.
        assert_eq!(back.vector, rec.vector);
        assert_eq!(back.sample_count, 3);
    }

    #[test]
    fn event_draft_without_identity() {
        let draft = EventDraft::new(None, EventKind::VerifyUnknown, "unregistered attempt");
        let bytes = rmp_serde::to_vec_named(&draft).unwrap();
        let back: EventDraft = rmp_serde::from_slice(&bytes).unwrap();
        assert!(back.identity_id.is_none());
        assert_eq!(back.kind, EventKind::VerifyUnknown);
    }
}
