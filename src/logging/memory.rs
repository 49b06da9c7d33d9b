//! In-memory logger destination
//!
//! Keeps everything it is given in plain collections behind a shared
//! handle: clones observe the same store, so a test can register one
//! clone as a destination and read the other after training. This is
//! the test double for the logging seam; anywhere a real sink would be
//! injected, tests inject this and assert on its contents.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{Callback, CallbackAction, EventContext};

use super::LoggerDestination;

/// A recorded metric data point.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    pub key: String,
    pub value: f64,
    pub step: u64,
}

#[derive(Debug, Default)]
struct Store {
    metrics: Vec<MetricRecord>,
    hyperparameters: HashMap<String, String>,
    artifacts: Vec<PathBuf>,
    fit_starts: u64,
    fit_ends: u64,
    close_calls: u64,
}

/// Logger destination that stores records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogger {
    store: Arc<Mutex<Store>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn metrics(&self) -> Vec<MetricRecord> {
        self.store().metrics.clone()
    }

    /// Values recorded for one metric key, in log order.
    pub fn metric_values(&self, key: &str) -> Vec<f64> {
        self.store()
            .metrics
            .iter()
            .filter(|m| m.key == key)
            .map(|m| m.value)
            .collect()
    }

    pub fn hyperparameters(&self) -> HashMap<String, String> {
        self.store().hyperparameters.clone()
    }

    pub fn artifacts(&self) -> Vec<PathBuf> {
        self.store().artifacts.clone()
    }

    pub fn fit_starts(&self) -> u64 {
        self.store().fit_starts
    }

    pub fn fit_ends(&self) -> u64 {
        self.store().fit_ends
    }

    pub fn close_calls(&self) -> u64 {
        self.store().close_calls
    }
}

impl Callback for MemoryLogger {
    fn fit_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.store().fit_starts += 1;
        CallbackAction::Continue
    }

    fn fit_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.store().fit_ends += 1;
        CallbackAction::Continue
    }

    fn close(&mut self) {
        self.store().close_calls += 1;
    }

    fn name(&self) -> &'static str {
        "MemoryLogger"
    }
}

impl LoggerDestination for MemoryLogger {
    fn log_metrics(&mut self, metrics: &HashMap<String, f64>, step: u64) {
        let mut store = self.store();
        for (key, value) in metrics {
            store.metrics.push(MetricRecord {
                key: key.clone(),
                value: *value,
                step,
            });
        }
    }

    fn log_hyperparameters(&mut self, params: &HashMap<String, String>) {
        self.store()
            .hyperparameters
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    fn log_artifact(&mut self, path: &Path) {
        self.store().artifacts.push(path.to_path_buf());
    }
}
