//! Periodic checkpoint marker callback

use std::path::{Path, PathBuf};

use crate::core::{Callback, CallbackAction, EventContext, Time, TimeUnit};

/// Writes run-progress checkpoints at a configurable cadence.
///
/// Listens on the checkpoint events and, every `interval`, writes a
/// JSON snapshot of the run's progress (timestamp, loss, learning rate,
/// run length) into `dir`. Model weights are saved separately through
/// [`Trainer::save_checkpoint`](crate::train::Trainer::save_checkpoint);
/// this callback records where a resumable boundary was reached and
/// always writes a final snapshot at fit end.
#[derive(Clone, Debug)]
pub struct CheckpointSaver {
    dir: PathBuf,
    interval: Time,
    last_saved: Option<u64>,
}

impl CheckpointSaver {
    /// Save into `dir` every `interval` (epochs or batches).
    pub fn new(dir: impl Into<PathBuf>, interval: Time) -> Self {
        Self { dir: dir.into(), interval, last_saved: None }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Progress marker of the last saved snapshot, if any.
    pub fn last_saved(&self) -> Option<u64> {
        self.last_saved
    }

    fn snapshot_path(&self, marker: u64) -> PathBuf {
        let suffix = self.interval.unit().suffix();
        self.dir.join(format!("checkpoint_{marker}{suffix}.json"))
    }

    fn due(&self, ctx: &EventContext) -> Option<u64> {
        let interval = self.interval.value().max(1);
        let position = match self.interval.unit() {
            TimeUnit::Epoch => ctx.epoch,
            TimeUnit::Batch => ctx.batch,
            TimeUnit::Sample => ctx.sample,
        };
        (position > 0 && position % interval == 0 && self.last_saved != Some(position))
            .then_some(position)
    }

    fn save(&mut self, ctx: &EventContext, marker: u64) {
        // Best-effort like all logging sinks; a failed write must not
        // kill the run.
        std::fs::create_dir_all(&self.dir).ok();
        let snapshot = serde_json::json!({
            "run_id": ctx.run_id.clone(),
            "epoch": ctx.epoch,
            "batch": ctx.batch,
            "sample": ctx.sample,
            "loss": ctx.loss,
            "lr": ctx.lr,
            "max_duration": ctx.max_duration.map(|d| d.to_string()),
        });
        std::fs::write(self.snapshot_path(marker), snapshot.to_string()).ok();
        self.last_saved = Some(marker);
    }
}

impl Callback for CheckpointSaver {
    fn batch_checkpoint(&mut self, ctx: &EventContext) -> CallbackAction {
        if self.interval.unit() != TimeUnit::Epoch {
            if let Some(marker) = self.due(ctx) {
                self.save(ctx, marker);
            }
        }
        CallbackAction::Continue
    }

    fn epoch_checkpoint(&mut self, ctx: &EventContext) -> CallbackAction {
        if self.interval.unit() == TimeUnit::Epoch {
            if let Some(marker) = self.due(ctx) {
                self.save(ctx, marker);
            }
        }
        CallbackAction::Continue
    }

    fn fit_end(&mut self, ctx: &EventContext) -> CallbackAction {
        let marker = match self.interval.unit() {
            TimeUnit::Epoch => ctx.epoch,
            TimeUnit::Batch => ctx.batch,
            TimeUnit::Sample => ctx.sample,
        };
        self.save(ctx, marker);
        CallbackAction::Continue
    }

    fn state_dict(&self) -> serde_json::Value {
        serde_json::json!({ "last_saved": self.last_saved })
    }

    fn load_state_dict(&mut self, state: &serde_json::Value) {
        self.last_saved = state.get("last_saved").and_then(|v| v.as_u64());
    }

    fn name(&self) -> &'static str {
        "CheckpointSaver"
    }
}
