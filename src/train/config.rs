//! Trainer configuration

use std::path::PathBuf;

use crate::core::Time;

/// Configuration for a [`Trainer`](super::Trainer).
///
/// # Example
///
/// ```
/// use ensayar::core::Time;
/// use ensayar::train::TrainerConfig;
///
/// let config = TrainerConfig::new()
///     .with_max_duration(Time::epochs(2))
///     .with_microbatch_size(1)
///     .with_learning_rate(0.05);
/// ```
#[derive(Clone, Debug)]
pub struct TrainerConfig {
    /// Run length
    pub max_duration: Time,
    /// Samples per microbatch; 0 trains whole batches
    pub microbatch_size: usize,
    /// Learning rate for parameter updates
    pub learning_rate: f32,
    /// Checkpoint to restore before the first fit
    pub load_path: Option<PathBuf>,
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_duration(mut self, duration: Time) -> Self {
        self.max_duration = duration;
        self
    }

    pub fn with_microbatch_size(mut self, size: usize) -> Self {
        self.microbatch_size = size;
        self
    }

    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_path = Some(path.into());
        self
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_duration: Time::epochs(1),
            microbatch_size: 0,
            learning_rate: 0.01,
            load_path: None,
        }
    }
}
