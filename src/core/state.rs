//! Mutable run state
//!
//! `State` is the container a run carries: the ordered callback list
//! (insertion order is dispatch order), progress counters, the run
//! length, and an optional profiler binding. The trainer mutates it as
//! the loop advances; `max_duration` is public so a finished run can be
//! extended and fit again.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::callback::{Callback, EventContext};
use super::time::{Time, Timestamp};
use crate::profiler::Profiler;

/// Mutable context for a single training run.
pub struct State {
    /// Identifier of the run, embedded in snapshots and checkpoints
    pub run_id: String,
    /// Run length; public so callers can extend a finished run
    pub max_duration: Option<Time>,
    /// Progress counters
    pub timestamp: Timestamp,
    /// Samples per microbatch (0 means whole batches)
    pub microbatch_size: usize,
    /// Most recent training loss
    pub loss: Option<f32>,
    /// Most recent evaluation loss
    pub val_loss: Option<f32>,
    /// Current learning rate
    pub lr: f32,
    callbacks: Vec<Box<dyn Callback>>,
    profiler: Option<Profiler>,
    started_at: Option<Instant>,
}

/// Serializable snapshot of a [`State`] for checkpointing.
#[derive(Debug, Serialize, Deserialize)]
struct StateDict {
    run_id: String,
    timestamp: Timestamp,
    max_duration: Option<Time>,
    callbacks: Vec<CallbackState>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CallbackState {
    name: String,
    state: serde_json::Value,
}

impl State {
    pub fn new() -> Self {
        let run_id = format!("run-{}", chrono::Utc::now().timestamp_millis());
        Self {
            run_id,
            max_duration: None,
            timestamp: Timestamp::new(),
            microbatch_size: 0,
            loss: None,
            val_loss: None,
            lr: 0.0,
            callbacks: Vec::new(),
            profiler: None,
            started_at: None,
        }
    }

    /// Set the run length.
    pub fn with_max_duration(mut self, duration: Time) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Set the microbatch size.
    pub fn with_microbatch_size(mut self, size: usize) -> Self {
        self.microbatch_size = size;
        self
    }

    /// Register a callback. Registration order is dispatch order.
    pub fn add_callback<C: Callback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Box::new(callback));
    }

    /// Register an already-boxed callback.
    pub fn add_boxed_callback(&mut self, callback: Box<dyn Callback>) {
        self.callbacks.push(callback);
    }

    pub fn callbacks(&self) -> &[Box<dyn Callback>] {
        &self.callbacks
    }

    pub fn callbacks_mut(&mut self) -> &mut [Box<dyn Callback>] {
        &mut self.callbacks
    }

    /// Bind a profiler to this run.
    pub fn set_profiler(&mut self, mut profiler: Profiler) {
        profiler.bind();
        self.profiler = Some(profiler);
    }

    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    pub fn profiler_mut(&mut self) -> Option<&mut Profiler> {
        self.profiler.as_mut()
    }

    /// Record the wall-clock start of a fit call.
    pub fn mark_started(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Seconds since the current fit began, 0 if none has.
    pub fn elapsed_secs(&self) -> f64 {
        self.started_at.map_or(0.0, |t| t.elapsed().as_secs_f64())
    }

    /// Record the completion of a training batch.
    pub fn record_batch(&mut self, samples: u64, loss: f32, lr: f32) {
        self.timestamp.advance_batch(samples);
        self.loss = Some(loss);
        self.lr = lr;
    }

    /// Record an epoch boundary.
    pub fn record_epoch(&mut self) {
        self.timestamp.advance_epoch();
    }

    /// Immutable snapshot handed to callback handlers.
    pub fn snapshot(&self) -> EventContext {
        EventContext {
            run_id: self.run_id.clone(),
            epoch: self.timestamp.epoch,
            batch: self.timestamp.batch,
            batch_in_epoch: self.timestamp.batch_in_epoch,
            sample: self.timestamp.sample,
            loss: self.loss,
            val_loss: self.val_loss,
            lr: self.lr,
            max_duration: self.max_duration,
            microbatch_size: self.microbatch_size,
            elapsed_secs: self.elapsed_secs(),
        }
    }

    /// Serializable snapshot of run progress plus per-callback state.
    pub fn state_dict(&self) -> serde_json::Value {
        let callbacks = self
            .callbacks
            .iter()
            .map(|cb| {
                serde_json::json!({
                    "name": cb.name(),
                    "state": cb.state_dict(),
                })
            })
            .collect::<Vec<_>>();
        serde_json::json!({
            "run_id": self.run_id.clone(),
            "timestamp": self.timestamp,
            "max_duration": self.max_duration,
            "callbacks": callbacks,
        })
    }

    /// Restore run progress and callback state from a snapshot.
    ///
    /// Callback entries are matched by position; an entry whose name no
    /// longer matches the registered callback is skipped.
    pub fn apply_state_dict(&mut self, value: &serde_json::Value) -> Result<(), serde_json::Error> {
        let dict: StateDict = serde_json::from_value(value.clone())?;
        self.run_id = dict.run_id;
        self.timestamp = dict.timestamp;
        self.max_duration = dict.max_duration;
        for (cb, entry) in self.callbacks.iter_mut().zip(dict.callbacks) {
            if cb.name() == entry.name {
                cb.load_state_dict(&entry.state);
            }
        }
        Ok(())
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
