//! Logger destination backed by the experiment tracker

use std::collections::HashMap;
use std::path::Path;

use crate::core::{Callback, CallbackAction, EventContext};
use crate::logging::LoggerDestination;
use crate::tracking::{ExperimentTracker, RunStatus};
use crate::tracking::storage::TrackingBackend;

/// Routes metric logging into an [`ExperimentTracker`] run.
///
/// A run is started at fit start (skipped if another run is already
/// active in the process) and ended at fit end. `close` cancels a run
/// left in flight; both paths are best-effort and repeat-safe, so a
/// half-finished fit never wedges later runs.
pub struct TrackerDestination<B: TrackingBackend + Send> {
    tracker: ExperimentTracker<B>,
    run_id: Option<String>,
}

impl<B: TrackingBackend + Send> TrackerDestination<B> {
    pub fn new(tracker: ExperimentTracker<B>) -> Self {
        Self { tracker, run_id: None }
    }

    pub fn tracker(&self) -> &ExperimentTracker<B> {
        &self.tracker
    }

    /// ID of the run currently being recorded, if any.
    pub fn run_id(&self) -> Option<&str> {
        self.run_id.as_deref()
    }

    fn end_run(&mut self, status: RunStatus) {
        if let Some(run_id) = self.run_id.take() {
            // Tracking must never take the training loop down with it.
            self.tracker.end_run(&run_id, status).ok();
        }
    }
}

impl<B: TrackingBackend + Send> Callback for TrackerDestination<B> {
    fn fit_start(&mut self, ctx: &EventContext) -> CallbackAction {
        if self.run_id.is_none() {
            match self.tracker.start_run(Some(ctx.run_id.as_str())) {
                Ok(run_id) => self.run_id = Some(run_id),
                // Another run is active; record nothing rather than fail
                Err(_) => {}
            }
        }
        CallbackAction::Continue
    }

    fn fit_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.end_run(RunStatus::Completed);
        CallbackAction::Continue
    }

    fn close(&mut self) {
        self.end_run(RunStatus::Cancelled);
    }

    fn name(&self) -> &'static str {
        "TrackerDestination"
    }
}

impl<B: TrackingBackend + Send> LoggerDestination for TrackerDestination<B> {
    fn log_metrics(&mut self, metrics: &HashMap<String, f64>, step: u64) {
        if let Some(run_id) = self.run_id.clone() {
            for (key, value) in metrics {
                self.tracker.log_metric(&run_id, key, *value, step).ok();
            }
        }
    }

    fn log_hyperparameters(&mut self, params: &HashMap<String, String>) {
        if let Some(run_id) = self.run_id.clone() {
            self.tracker.log_params(&run_id, params).ok();
        }
    }

    fn log_artifact(&mut self, path: &Path) {
        if let Some(run_id) = self.run_id.clone() {
            if let Some(path) = path.to_str() {
                self.tracker.log_artifact(&run_id, path).ok();
            }
        }
    }
}
