//! Multivariate slice sampling in log space.
//!
//! Used to adapt concentration hyperparameters: the sampler operates on
//! `u = ln(pseudo)` so positivity is automatic, with the change-of-variable
//! Jacobian `sum(u)` added to the target log density.

use rand::rngs::SmallRng;
use rand::Rng;

/// Run `num_iterations` slice-sampling updates of `raw` (log coordinates).
///
/// Each iteration draws a slice height under `log_density(raw) + sum(raw)`,
/// brackets every dimension with a fixed-width interval of `step_size`
/// containing the current point (no expansion loop), then repeatedly draws
/// a joint candidate, shrinking each violated bound toward the current
/// point until the candidate clears the slice.
///
/// The shrink loop terminates almost surely for unimodal targets; it is
/// not bounded by a fixed retry count.
pub fn slice_sample_log<F>(
    rng: &mut SmallRng,
    raw: &mut [f64],
    num_iterations: usize,
    step_size: f64,
    mut log_density: F,
) where
    F: FnMut(&[f64]) -> f64,
{
    let dim = raw.len();

    let mut lower = vec![0.0; dim];
    let mut upper = vec![0.0; dim];
    let mut cand = vec![0.0; dim];

    let mut raw_sum: f64 = raw.iter().sum();

    for _ in 0..num_iterations {
        let target = log_density(raw) + raw_sum;
        let height = rng.random::<f64>().ln() + target;

        for i in 0..dim {
            lower[i] = raw[i] - rng.random::<f64>() * step_size;
            upper[i] = lower[i] + step_size;
        }

        loop {
            let mut cand_sum = 0.0;
            for i in 0..dim {
                cand[i] = lower[i] + rng.random::<f64>() * (upper[i] - lower[i]);
                cand_sum += cand[i];
            }

            if log_density(&cand) + cand_sum > height {
                raw_sum = cand_sum;
                break;
            }

            for i in 0..dim {
                if cand[i] < raw[i] {
                    lower[i] = cand[i];
                } else {
                    upper[i] = cand[i];
                }
            }
        }

        raw.copy_from_slice(&cand);
    }
}
