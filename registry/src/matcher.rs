//! Nearest-centroid matching.

use facegate_store::CentroidRecord;

use crate::centroid::l2_distance;

/// Decision for one probe embedding.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// The nearest centroid is within the threshold.
    Match {
        identity_id: String,
        distance: f32,
    },

    /// No centroid is close enough. `distance` is the nearest distance
    /// found, or None when no centroids exist at all.
    Unknown { distance: Option<f32> },
}

/// Find the centroid nearest to the probe and apply the decision threshold.
///
/// A linear scan: correct, and fast enough for the identity counts this
/// system targets (tens to low thousands). The contract, not the scan, is
/// the stable part; an ANN index can replace it behind the same signature.
pub fn match_probe(probe: &[f32], centroids: &[CentroidRecord], threshold: f32) -> MatchOutcome {
    let mut best: Option<(&CentroidRecord, f32)> = None;
    for c in centroids {
        let d = l2_distance(probe, &c.vector);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((c, d));
        }
    }

    match best {
        Some((c, d)) if d <= threshold => MatchOutcome::Match {
            identity_id: c.identity_id.clone(),
            distance: d,
        },
        Some((_, d)) => MatchOutcome::Unknown { distance: Some(d) },
        None => MatchOutcome::Unknown { distance: None },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn centroid(id: &str, vector: &[f32]) -> CentroidRecord {
        CentroidRecord {
            identity_id: id.into(),
            vector: vector.to_vec(),
            sample_count: 1,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_set_is_unknown_without_distance() {
        let got = match_probe(&[1.0, 0.0], &[], 0.7);
        assert_eq!(got, MatchOutcome::Unknown { distance: None });
    }

    #[test]
    fn nearest_centroid_wins() {
        let centroids = vec![
            centroid("KmMin001", &[1.0, 0.0, 0.0]),
            centroid("LeAnn001", &[0.0, 1.0, 0.0]),
        ];
        let got = match_probe(&[0.9, 0.1, 0.0], &centroids, 0.7);
        match got {
            MatchOutcome::Match { identity_id, distance } => {
                assert_eq!(identity_id, "KmMin001");
                assert!(distance < 0.2);
            }
            other => panic!("expected match, got {other:?}"),
        }
    }

    #[test]
    fn beyond_threshold_is_unknown_with_distance() {
        let centroids = vec![centroid("KmMin001", &[1.0, 0.0, 0.0])];
        let got = match_probe(&[0.0, 1.0, 0.0], &centroids, 0.7);
        match got {
            MatchOutcome::Unknown { distance: Some(d) } => {
                assert!((d - std::f32::consts::SQRT_2).abs() < 1e-6)
            }
            other => panic!("expected unknown with distance, got {other:?}"),
        }
    }

    #[test]
    fn distance_exactly_at_threshold_matches() {
        let centroids = vec![centroid("KmMin001", &[0.0, 0.0])];
        let got = match_probe(&[0.7, 0.0], &centroids, 0.7);
        assert!(matches!(got, MatchOutcome::Match { .. }));
    }
}
