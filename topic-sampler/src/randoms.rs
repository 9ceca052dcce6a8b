//! Discrete sampling from unnormalized weight vectors.

use rand::rngs::SmallRng;
use rand::Rng;

/// Sample an index proportionally to `weights`, whose sum the caller
/// supplies (already accumulated while scoring).
///
/// Scans cumulative partial sums against `uniform(0,1) * total` and
/// returns the first index whose running sum exceeds the draw; the last
/// index absorbs any floating-point slack. `total` must be positive --
/// smoothing guarantees every score is strictly positive, so a zero total
/// is a caller contract violation.
#[inline]
pub fn sample_discrete(weights: &[f64], total: f64, rng: &mut SmallRng) -> usize {
    debug_assert!(total > 0.0, "degenerate discrete distribution");

    let draw = rng.random::<f64>() * total;

    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative > draw {
            return i;
        }
    }

    weights.len() - 1
}

/// Sample an index from log-domain weights.
///
/// Stabilized by subtracting the maximum before exponentiating, then
/// reduced to [`sample_discrete`].
pub fn sample_discrete_log(log_weights: &[f64], rng: &mut SmallRng) -> usize {
    let max = log_weights.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut weights = vec![0.0; log_weights.len()];
    let mut total = 0.0;
    for (w, &lw) in weights.iter_mut().zip(log_weights) {
        *w = (lw - max).exp();
        total += *w;
    }

    sample_discrete(&weights, total, rng)
}
