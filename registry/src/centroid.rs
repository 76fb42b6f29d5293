//! Running-mean centroid arithmetic.

/// Fold one embedding into a running mean holding `n` samples, in place.
///
/// Welford-style update `mean += (x - mean) / (n + 1)`: algebraically the
/// arithmetic mean of all samples seen, without the floating-point drift of
/// re-multiplying the mean by `n`. Uses f64 intermediate precision.
pub(crate) fn fold_mean(mean: &mut [f32], n: u32, x: &[f32]) {
    let divisor = f64::from(n) + 1.0;
    for (m, &v) in mean.iter_mut().zip(x) {
        let delta = f64::from(v) - f64::from(*m);
        *m = (f64::from(*m) + delta / divisor) as f32;
    }
}

/// Euclidean distance between two vectors of equal length.
/// Uses f64 intermediate precision.
pub(crate) fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let d = f64::from(x) - f64::from(y);
        sum += d * d;
    }
    sum.sqrt() as f32
}
