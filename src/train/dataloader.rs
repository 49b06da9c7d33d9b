//! In-memory batch source

use super::batch::Batch;

/// Ordered in-memory collection of training batches.
#[derive(Clone, Debug, Default)]
pub struct DataLoader {
    batches: Vec<Batch>,
}

impl DataLoader {
    pub fn from_batches(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Total number of samples across all batches
    pub fn total_samples(&self) -> usize {
        self.batches.iter().map(Batch::size).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Batch> {
        self.batches.iter()
    }
}

impl<'a> IntoIterator for &'a DataLoader {
    type Item = &'a Batch;
    type IntoIter = std::slice::Iter<'a, Batch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};

    #[test]
    fn test_len_and_samples() {
        let batches = vec![
            Batch::new(Array2::zeros((2, 1)), Array1::zeros(2)),
            Batch::new(Array2::zeros((3, 1)), Array1::zeros(3)),
        ];
        let loader = DataLoader::from_batches(batches);

        assert_eq!(loader.len(), 2);
        assert_eq!(loader.total_samples(), 5);
        assert!(!loader.is_empty());
        assert_eq!(loader.iter().count(), 2);
    }

    #[test]
    fn test_empty_loader() {
        let loader = DataLoader::default();
        assert!(loader.is_empty());
        assert_eq!(loader.total_samples(), 0);
    }
}
