//! Synthetic regression data for tests and demos

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::batch::Batch;

/// Generate a linear regression problem.
///
/// Inputs are uniform in `[-1, 1]`; targets follow a random linear map
/// plus uniform noise of magnitude `noise`. Deterministic per seed.
pub fn regression(
    n_samples: usize,
    n_features: usize,
    noise: f32,
    seed: u64,
) -> (Array2<f32>, Array1<f32>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let true_weights: Array1<f32> =
        Array1::from_shape_fn(n_features, |_| rng.gen_range(-2.0..2.0));
    let true_bias: f32 = rng.gen_range(-1.0..1.0);

    let inputs = Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-1.0..1.0));
    let targets = Array1::from_shape_fn(n_samples, |i| {
        let clean = inputs.row(i).dot(&true_weights) + true_bias;
        clean + if noise > 0.0 { rng.gen_range(-noise..noise) } else { 0.0 }
    });
    (inputs, targets)
}

/// Generate `n_batches` regression batches of `batch_size` samples.
pub fn regression_batches(
    n_batches: usize,
    batch_size: usize,
    n_features: usize,
    noise: f32,
    seed: u64,
) -> Vec<Batch> {
    let (inputs, targets) = regression(n_batches * batch_size, n_features, noise, seed);
    (0..n_batches)
        .map(|b| {
            let start = b * batch_size;
            let end = start + batch_size;
            Batch::new(
                inputs.slice(ndarray::s![start..end, ..]).to_owned(),
                targets.slice(ndarray::s![start..end]).to_owned(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let (inputs, targets) = regression(10, 3, 0.1, 7);
        assert_eq!(inputs.dim(), (10, 3));
        assert_eq!(targets.len(), 10);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let (a, _) = regression(5, 2, 0.1, 42);
        let (b, _) = regression(5, 2, 0.1, 42);
        let (c, _) = regression(5, 2, 0.1, 43);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_batches_cover_all_samples() {
        let batches = regression_batches(4, 3, 2, 0.0, 1);
        assert_eq!(batches.len(), 4);
        assert!(batches.iter().all(|b| b.size() == 3 && b.num_features() == 2));
    }

    #[test]
    fn test_noiseless_targets_are_linear() {
        let (inputs, targets) = regression(6, 2, 0.0, 9);
        // With zero noise the same seed reproduces targets exactly from
        // the inputs, so two samples with identical inputs would need
        // identical targets; spot-check determinism instead.
        let (inputs2, targets2) = regression(6, 2, 0.0, 9);
        assert_eq!(inputs, inputs2);
        assert_eq!(targets, targets2);
    }
}
