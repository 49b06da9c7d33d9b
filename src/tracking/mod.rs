//! In-process experiment tracking
//!
//! Records training runs — parameters, per-step metrics, artifacts,
//! tags — behind a pluggable [`TrackingBackend`]. One run may be active
//! per process at a time; the registry in [`active`] carries that state
//! across trackers the way an external tracking service would, and
//! [`clear_active_runs`] is the explicit cleanup used between tests.
//!
//! # Example
//!
//! ```
//! use ensayar::tracking::{clear_active_runs, ExperimentTracker, RunStatus};
//! use ensayar::tracking::storage::InMemoryBackend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! clear_active_runs();
//! let mut tracker = ExperimentTracker::new("baseline", InMemoryBackend::new());
//! tracker.add_tag("team", "ml-infra");
//!
//! let run_id = tracker.start_run(Some("sweep-0"))?;
//! tracker.log_param(&run_id, "lr", "0.001")?;
//! tracker.log_metric(&run_id, "loss", 0.5, 1)?;
//! tracker.end_run(&run_id, RunStatus::Completed)?;
//!
//! assert_eq!(tracker.list_runs()?.len(), 1);
//! # clear_active_runs();
//! # Ok(())
//! # }
//! ```

mod active;
pub mod storage;


pub use active::{active_run, active_run_count, clear_active_runs};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use storage::{TrackingBackend, TrackingStorageError};

/// Status of a tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Run is actively recording
    Active,
    /// Run completed successfully
    Completed,
    /// Run failed
    Failed,
    /// Run was cancelled
    Cancelled,
}

/// A metric data point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub step: u64,
}

/// Reference to an artifact produced by a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub path: String,
    /// SHA-256 of the file contents, when the file was readable at log
    /// time
    pub sha256: Option<String>,
}

/// A single tracked run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: Option<String>,
    pub experiment_name: String,
    pub status: RunStatus,
    /// Hyperparameters, string-encoded
    pub params: HashMap<String, String>,
    /// Metric history per key
    pub metrics: HashMap<String, Vec<MetricPoint>>,
    pub artifacts: Vec<ArtifactRef>,
    pub tags: HashMap<String, String>,
    /// Unix millis when the run started
    pub start_time_ms: Option<u64>,
    /// Unix millis when the run ended
    pub end_time_ms: Option<u64>,
}

impl Run {
    fn new(run_id: String, run_name: Option<String>, experiment_name: String) -> Self {
        Self {
            run_id,
            run_name,
            experiment_name,
            status: RunStatus::Active,
            params: HashMap::new(),
            metrics: HashMap::new(),
            artifacts: Vec::new(),
            tags: HashMap::new(),
            start_time_ms: Some(now_ms()),
            end_time_ms: None,
        }
    }
}

fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Errors from experiment tracking operations
#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("run not found: {0}")]
    RunNotFound(String),

    #[error("run is not active: {0}")]
    RunNotActive(String),

    #[error("a run is already active: {0}")]
    RunAlreadyActive(String),

    #[error("storage error: {0}")]
    Storage(#[from] TrackingStorageError),
}

/// Result alias for tracking operations
pub type Result<T> = std::result::Result<T, TrackingError>;

/// Manages runs under one experiment name, persisting through a
/// pluggable [`TrackingBackend`].
#[derive(Debug)]
pub struct ExperimentTracker<B: TrackingBackend> {
    experiment_name: String,
    tags: HashMap<String, String>,
    backend: B,
    /// The in-flight run, held in memory for fast mutation
    current: Option<Run>,
    next_run_seq: u64,
}

impl<B: TrackingBackend> ExperimentTracker<B> {
    pub fn new(experiment_name: impl Into<String>, backend: B) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            tags: HashMap::new(),
            backend,
            current: None,
            next_run_seq: 1,
        }
    }

    /// Add an experiment-level tag, inherited by future runs.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    #[must_use]
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    /// Start a new run. Fails with [`TrackingError::RunAlreadyActive`]
    /// while any run in the process is still active.
    pub fn start_run(&mut self, run_name: Option<&str>) -> Result<String> {
        if let Some(existing) = active::active_run() {
            return Err(TrackingError::RunAlreadyActive(existing));
        }

        let run_id = format!("{}-run-{}", self.experiment_name, self.next_run_seq);
        self.next_run_seq += 1;

        let mut run = Run::new(
            run_id.clone(),
            run_name.map(String::from),
            self.experiment_name.clone(),
        );
        run.tags.extend(self.tags.iter().map(|(k, v)| (k.clone(), v.clone())));

        active::register(&run_id);
        self.current = Some(run);
        Ok(run_id)
    }

    /// End the active run with `status`, persisting it to the backend.
    pub fn end_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        if self.current.as_ref().map(|r| r.run_id.as_str()) != Some(run_id) {
            return Err(TrackingError::RunNotFound(run_id.to_string()));
        }
        let mut run = self
            .current
            .take()
            .ok_or_else(|| TrackingError::RunNotFound(run_id.to_string()))?;
        run.status = status;
        run.end_time_ms = Some(now_ms());

        self.backend.save_run(&run)?;
        active::deregister(run_id);
        Ok(())
    }

    fn active_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        self.current
            .as_mut()
            .filter(|run| run.run_id == run_id)
            .ok_or_else(|| TrackingError::RunNotActive(run_id.to_string()))
    }

    /// Log a single hyperparameter on the active run.
    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        self.active_mut(run_id)?
            .params
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Log several hyperparameters at once.
    pub fn log_params(&mut self, run_id: &str, params: &HashMap<String, String>) -> Result<()> {
        let run = self.active_mut(run_id)?;
        run.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    /// Log a metric value at a step.
    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64, step: u64) -> Result<()> {
        self.active_mut(run_id)?
            .metrics
            .entry(key.to_string())
            .or_default()
            .push(MetricPoint { value, step });
        Ok(())
    }

    /// Log an artifact path, recording a SHA-256 digest when the file
    /// is readable.
    pub fn log_artifact(&mut self, run_id: &str, path: &str) -> Result<()> {
        let sha256 = std::fs::read(path)
            .ok()
            .map(|bytes| format!("{:x}", Sha256::digest(&bytes)));
        self.active_mut(run_id)?
            .artifacts
            .push(ArtifactRef { path: path.to_string(), sha256 });
        Ok(())
    }

    /// Fetch a run: the active one first, then the backend.
    pub fn get_run(&self, run_id: &str) -> Result<Run> {
        if let Some(run) = self.current.as_ref().filter(|r| r.run_id == run_id) {
            return Ok(run.clone());
        }
        self.backend
            .load_run(run_id)
            .map_err(|_| TrackingError::RunNotFound(run_id.to_string()))
    }

    /// List every run of this tracker, active and persisted.
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let mut runs = self.backend.list_runs()?;
        if let Some(run) = &self.current {
            if !runs.iter().any(|r| r.run_id == run.run_id) {
                runs.push(run.clone());
            }
        }
        runs.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Mutex, MutexGuard, PoisonError};

    static REGISTRY_LOCK: Mutex<()> = Mutex::new(());

    /// Serializes tests that touch the process-wide active-run
    /// registry.
    pub fn registry_guard() -> MutexGuard<'static, ()> {
        REGISTRY_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
