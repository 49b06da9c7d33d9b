//! Training batch

use ndarray::{s, Array1, Array2};

/// A batch of samples: one input row per sample.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Input features, `(samples, features)`
    pub inputs: Array2<f32>,
    /// Targets, one per sample
    pub targets: Array1<f32>,
}

impl Batch {
    /// Create a batch. `inputs` must have one row per target.
    pub fn new(inputs: Array2<f32>, targets: Array1<f32>) -> Self {
        debug_assert_eq!(inputs.nrows(), targets.len());
        Self { inputs, targets }
    }

    /// Number of samples
    pub fn size(&self) -> usize {
        self.targets.len()
    }

    pub fn num_features(&self) -> usize {
        self.inputs.ncols()
    }

    /// Split into microbatches of at most `microbatch_size` samples.
    ///
    /// A size of 0 means no splitting; the whole batch is returned as
    /// the single microbatch.
    pub fn split(&self, microbatch_size: usize) -> Vec<Batch> {
        if microbatch_size == 0 || microbatch_size >= self.size() {
            return vec![self.clone()];
        }
        let mut micro = Vec::with_capacity(self.size().div_ceil(microbatch_size));
        let mut start = 0;
        while start < self.size() {
            let end = (start + microbatch_size).min(self.size());
            micro.push(Batch {
                inputs: self.inputs.slice(s![start..end, ..]).to_owned(),
                targets: self.targets.slice(s![start..end]).to_owned(),
            });
            start = end;
        }
        micro
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn batch_of(n: usize) -> Batch {
        let inputs = Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f32);
        let targets = Array1::from_shape_fn(n, |i| i as f32);
        Batch::new(inputs, targets)
    }

    #[test]
    fn test_size_and_features() {
        let batch = batch_of(4);
        assert_eq!(batch.size(), 4);
        assert_eq!(batch.num_features(), 2);
    }

    #[test]
    fn test_split_zero_keeps_whole_batch() {
        let batch = batch_of(4);
        let micro = batch.split(0);
        assert_eq!(micro.len(), 1);
        assert_eq!(micro[0].size(), 4);
    }

    #[test]
    fn test_split_into_microbatches() {
        let batch = batch_of(5);
        let micro = batch.split(2);
        assert_eq!(micro.len(), 3);
        assert_eq!(micro[0].size(), 2);
        assert_eq!(micro[2].size(), 1);

        // Every sample appears exactly once, in order
        let total: usize = micro.iter().map(Batch::size).sum();
        assert_eq!(total, 5);
        assert_eq!(micro[1].targets, array![2.0, 3.0]);
        assert_eq!(micro[2].inputs.row(0).to_vec(), vec![8.0, 9.0]);
    }

    #[test]
    fn test_split_size_one() {
        let batch = batch_of(3);
        let micro = batch.split(1);
        assert_eq!(micro.len(), 3);
        assert!(micro.iter().all(|m| m.size() == 1));
    }
}
