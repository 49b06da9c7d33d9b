//! The training driver
//!
//! `Trainer` owns the model, data, run state, and logger, and drives
//! the event sequence through a fresh [`Engine`] per fit call:
//!
//! ```text
//! Init (once) → [BeforeLoad → restore → AfterLoad]
//! FitStart
//!   per epoch: EpochStart
//!     per batch: BatchStart
//!       per microbatch: BeforeForward → AfterForward
//!                       → BeforeBackward → AfterBackward
//!     BatchEnd → BatchCheckpoint
//!   [EvalStart → (EvalBatchStart → EvalBatchEnd)* → EvalEnd]
//!   EpochEnd → EpochCheckpoint
//! FitEnd
//! ```
//!
//! `fit` trains from the current timestamp until `max_duration` and is
//! repeatable: raise `state_mut().max_duration` and call it again.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use crate::core::{
    Callback, CallbackAction, Engine, EngineError, Event, State,
};
use crate::logging::{Logger, LoggerDestination};
use crate::profiler::Profiler;

use super::batch::Batch;
use super::config::TrainerConfig;
use super::dataloader::DataLoader;
use super::model::Model;

/// Errors from training
#[derive(Debug, thiserror::Error)]
pub enum TrainerError {
    #[error("event dispatch error: {0}")]
    Engine(#[from] EngineError),

    #[error("no run length configured; set max_duration before fitting")]
    MissingDuration,

    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one fit call.
#[derive(Debug, Clone)]
pub struct FitSummary {
    /// Epochs completed since the run began
    pub epochs_completed: u64,
    /// Batches completed since the run began
    pub batches_completed: u64,
    /// Mean loss of the last trained epoch
    pub final_loss: f32,
    /// Best epoch loss seen during this fit
    pub best_loss: f32,
    /// Whether a callback stopped the fit before `max_duration`
    pub stopped_early: bool,
    /// Wall-clock seconds this fit took
    pub elapsed_secs: f64,
}

/// Drives the training loop and its event lifecycle.
///
/// # Example
///
/// ```
/// use ensayar::callbacks::EarlyStopper;
/// use ensayar::core::Time;
/// use ensayar::train::{synthetic, DataLoader, LinearModel, Trainer, TrainerConfig};
///
/// # fn main() -> Result<(), ensayar::train::TrainerError> {
/// let batches = synthetic::regression_batches(4, 2, 1, 0.05, 42);
/// let config = TrainerConfig::new()
///     .with_max_duration(Time::epochs(2))
///     .with_learning_rate(0.1);
///
/// let mut trainer = Trainer::new(
///     Box::new(LinearModel::new(1)),
///     DataLoader::from_batches(batches),
///     config,
/// );
/// trainer.add_callback(EarlyStopper::new(5, 0.0001));
///
/// let summary = trainer.fit()?;
/// assert_eq!(summary.epochs_completed, 2);
/// # Ok(())
/// # }
/// ```
pub struct Trainer {
    model: Box<dyn Model>,
    train_data: DataLoader,
    eval_data: Option<DataLoader>,
    config: TrainerConfig,
    state: State,
    logger: Logger,
    init_done: bool,
}

impl Trainer {
    pub fn new(model: Box<dyn Model>, train_data: DataLoader, config: TrainerConfig) -> Self {
        let mut state = State::new()
            .with_max_duration(config.max_duration)
            .with_microbatch_size(config.microbatch_size);
        state.lr = config.learning_rate;
        Self {
            model,
            train_data,
            eval_data: None,
            config,
            state,
            logger: Logger::new(),
            init_done: false,
        }
    }

    /// Attach an evaluation set, run after every epoch.
    pub fn set_eval_data(&mut self, eval_data: DataLoader) {
        self.eval_data = Some(eval_data);
    }

    /// Register a callback on the run state.
    pub fn add_callback<C: Callback + 'static>(&mut self, callback: C) {
        self.state.add_callback(callback);
    }

    /// Register a logger destination.
    pub fn add_destination<D: LoggerDestination + 'static>(&mut self, destination: D) {
        self.logger.add_destination(destination);
    }

    /// Bind a profiler; its schedule is consulted at every batch start.
    pub fn set_profiler(&mut self, profiler: Profiler) {
        self.state.set_profiler(profiler);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Mutable run state, e.g. to extend `max_duration` between fits.
    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        &mut self.logger
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train from the current timestamp until `max_duration`.
    pub fn fit(&mut self) -> Result<FitSummary, TrainerError> {
        let Self { model, train_data, eval_data, config, state, logger, init_done } = self;

        let started = Instant::now();
        state.mark_started();
        let mut engine = Engine::new(state, logger);

        if !*init_done {
            engine.run_event(Event::Init)?;
            *init_done = true;
            if let Some(path) = config.load_path.clone() {
                restore_checkpoint(&mut engine, model.as_mut(), &path)?;
            }
        }

        let mut stopped_early = engine.run_event(Event::FitStart)? == CallbackAction::Stop;
        // After FitStart so destinations that open a run per fit see them
        log_hyperparameters(&mut engine, config);
        let mut final_loss = 0.0f32;
        let mut best_loss = f32::INFINITY;

        'epochs: while !stopped_early {
            let max_duration = engine
                .state()
                .max_duration
                .ok_or(TrainerError::MissingDuration)?;
            if engine.state().timestamp.reached(max_duration) {
                break;
            }

            match engine.run_event(Event::EpochStart)? {
                CallbackAction::Stop => {
                    stopped_early = true;
                    break;
                }
                CallbackAction::SkipEpoch => {
                    // A skipped epoch still counts toward the duration
                    engine.state_mut().record_epoch();
                    continue;
                }
                CallbackAction::Continue => {}
            }

            let mut epoch_loss_sum = 0.0f64;
            let mut epoch_batches = 0u64;

            for batch in train_data.iter() {
                if engine.state().timestamp.reached(max_duration) {
                    break;
                }
                let ts = engine.state().timestamp;
                if let Some(profiler) = engine.state_mut().profiler_mut() {
                    profiler.action_for(&ts);
                }

                if engine.run_event(Event::BatchStart)? == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }

                let batch_loss =
                    train_batch(&mut engine, model.as_mut(), batch, config.learning_rate)?;
                epoch_loss_sum += f64::from(batch_loss);
                epoch_batches += 1;

                let step = engine.state().timestamp.batch;
                let mut metrics = HashMap::new();
                metrics.insert("train/loss".to_string(), f64::from(batch_loss));
                engine.logger_mut().log_metrics(&metrics, step);

                let action = engine
                    .run_event(Event::BatchEnd)?
                    .merge(engine.run_event(Event::BatchCheckpoint)?);
                if action == CallbackAction::Stop {
                    stopped_early = true;
                    break 'epochs;
                }
            }

            if epoch_batches > 0 {
                final_loss = (epoch_loss_sum / epoch_batches as f64) as f32;
                best_loss = best_loss.min(final_loss);
            }

            if let Some(eval) = eval_data.as_ref().filter(|e| !e.is_empty()) {
                let val_loss = run_eval(&mut engine, model.as_mut(), eval)?;
                engine.state_mut().val_loss = Some(val_loss);
                let mut metrics = HashMap::new();
                metrics.insert("eval/loss".to_string(), f64::from(val_loss));
                let step = engine.state().timestamp.batch;
                engine.logger_mut().log_metrics(&metrics, step);
            }

            engine.state_mut().record_epoch();

            let action = engine
                .run_event(Event::EpochEnd)?
                .merge(engine.run_event(Event::EpochCheckpoint)?);
            if action == CallbackAction::Stop {
                stopped_early = true;
                break;
            }
        }

        engine.run_event(Event::FitEnd)?;

        Ok(FitSummary {
            epochs_completed: engine.state().timestamp.epoch,
            batches_completed: engine.state().timestamp.batch,
            final_loss,
            best_loss: if best_loss.is_finite() { best_loss } else { final_loss },
            stopped_early,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Close callbacks and destinations.
    ///
    /// Uses a fresh engine, so calling this repeatedly exercises the
    /// idempotent-close contract of every registered callback.
    pub fn close(&mut self) {
        let mut engine = Engine::new(&mut self.state, &mut self.logger);
        engine.close();
    }

    /// Write a resumable checkpoint: run progress plus model weights.
    pub fn save_checkpoint(&mut self, path: impl AsRef<Path>) -> Result<(), TrainerError> {
        let payload = serde_json::json!({
            "state": self.state.state_dict(),
            "model": self.model.state_dict(),
        });
        std::fs::write(path, serde_json::to_string_pretty(&payload)?)?;
        Ok(())
    }
}

fn log_hyperparameters(engine: &mut Engine<'_>, config: &TrainerConfig) {
    let mut params = HashMap::new();
    params.insert("learning_rate".to_string(), config.learning_rate.to_string());
    params.insert(
        "microbatch_size".to_string(),
        config.microbatch_size.to_string(),
    );
    params.insert("max_duration".to_string(), config.max_duration.to_string());
    engine.logger_mut().log_hyperparameters(&params);
}

fn restore_checkpoint(
    engine: &mut Engine<'_>,
    model: &mut dyn Model,
    path: &Path,
) -> Result<(), TrainerError> {
    engine.run_event(Event::BeforeLoad)?;
    let payload: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    if let Some(state_value) = payload.get("state") {
        engine.state_mut().apply_state_dict(state_value)?;
    }
    if let Some(model_value) = payload.get("model") {
        model.load_state_dict(model_value)?;
    }
    engine.run_event(Event::AfterLoad)?;
    Ok(())
}

/// One training batch: microbatched forward/backward, then a single
/// parameter update over the accumulated gradients.
fn train_batch(
    engine: &mut Engine<'_>,
    model: &mut dyn Model,
    batch: &Batch,
    lr: f32,
) -> Result<f32, TrainerError> {
    model.zero_grad();
    let mut weighted_loss = 0.0f32;

    let microbatch_size = engine.state().microbatch_size;
    for microbatch in batch.split(microbatch_size) {
        engine.run_event(Event::BeforeForward)?;
        let loss = model.forward(&microbatch);
        engine.run_event(Event::AfterForward)?;

        engine.run_event(Event::BeforeBackward)?;
        model.backward();
        engine.run_event(Event::AfterBackward)?;

        weighted_loss += loss * microbatch.size() as f32;
    }
    model.update(lr);

    let batch_loss = weighted_loss / batch.size().max(1) as f32;
    engine
        .state_mut()
        .record_batch(batch.size() as u64, batch_loss, lr);
    Ok(batch_loss)
}

fn run_eval(
    engine: &mut Engine<'_>,
    model: &mut dyn Model,
    eval: &DataLoader,
) -> Result<f32, TrainerError> {
    engine.run_event(Event::EvalStart)?;
    let mut weighted_loss = 0.0f32;
    let mut samples = 0usize;
    for batch in eval.iter() {
        engine.run_event(Event::EvalBatchStart)?;
        let loss = model.forward(batch);
        weighted_loss += loss * batch.size() as f32;
        samples += batch.size();
        engine.run_event(Event::EvalBatchEnd)?;
    }
    // Evaluation must leave no gradient residue behind
    model.zero_grad();
    engine.run_event(Event::EvalEnd)?;
    Ok(weighted_loss / samples.max(1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{EarlyStopper, EventCounter, LrMonitor};
    use crate::core::Time;
    use crate::logging::MemoryLogger;
    use crate::profiler::{Profiler, ProfilerAction};
    use crate::train::synthetic::regression_batches;
    use crate::train::LinearModel;

    fn loader(n_batches: usize, batch_size: usize) -> DataLoader {
        DataLoader::from_batches(regression_batches(n_batches, batch_size, 1, 0.05, 7))
    }

    fn trainer_with(config: TrainerConfig) -> Trainer {
        Trainer::new(Box::new(LinearModel::new(1)), loader(4, 2), config)
    }

    #[test]
    fn test_fit_runs_configured_epochs() {
        let mut trainer = trainer_with(
            TrainerConfig::new()
                .with_max_duration(Time::epochs(2))
                .with_learning_rate(0.1),
        );

        let summary = trainer.fit().unwrap();
        assert_eq!(summary.epochs_completed, 2);
        assert_eq!(summary.batches_completed, 8);
        assert!(!summary.stopped_early);
        assert!(summary.final_loss.is_finite());
        assert!(summary.best_loss <= summary.final_loss + 1e-6);
    }

    #[test]
    fn test_fit_reduces_loss() {
        let mut trainer = trainer_with(
            TrainerConfig::new()
                .with_max_duration(Time::epochs(10))
                .with_learning_rate(0.2),
        );
        let logs = MemoryLogger::new();
        trainer.add_destination(logs.clone());

        trainer.fit().unwrap();

        let losses = logs.metric_values("train/loss");
        assert_eq!(losses.len(), 40);
        let first_epoch: f64 = losses[..4].iter().sum::<f64>() / 4.0;
        let last_epoch: f64 = losses[36..].iter().sum::<f64>() / 4.0;
        assert!(last_epoch < first_epoch, "{last_epoch} should be below {first_epoch}");
    }

    #[test]
    fn test_event_sequence_counts() {
        let mut trainer = trainer_with(
            TrainerConfig::new()
                .with_max_duration(Time::epochs(2))
                .with_microbatch_size(1),
        );
        trainer.add_callback(EventCounter::new());

        trainer.fit().unwrap();

        let counts = trainer.state().callbacks()[0].state_dict();
        let count = |event: Event| {
            counts
                .get("counts")
                .and_then(|c| c.get(event.name()))
                .and_then(|v| v.as_u64())
                .unwrap_or(0)
        };
        assert_eq!(count(Event::Init), 1);
        assert_eq!(count(Event::FitStart), 1);
        assert_eq!(count(Event::EpochStart), 2);
        // 4 batches of 2 samples, microbatch size 1: 8 forward passes/epoch
        assert_eq!(count(Event::BatchStart), 8);
        assert_eq!(count(Event::BeforeForward), 16);
        assert_eq!(count(Event::AfterBackward), 16);
        assert_eq!(count(Event::BatchEnd), 8);
        assert_eq!(count(Event::BatchCheckpoint), 8);
        assert_eq!(count(Event::EpochEnd), 2);
        assert_eq!(count(Event::EpochCheckpoint), 2);
        assert_eq!(count(Event::FitEnd), 1);
    }

    #[test]
    fn test_second_fit_does_not_rerun_init() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(1)));
        trainer.add_callback(EventCounter::new());

        trainer.fit().unwrap();
        let duration = trainer.state().max_duration.unwrap();
        trainer.state_mut().max_duration = Some(duration * 2);
        trainer.fit().unwrap();

        let counts = trainer.state().callbacks()[0].state_dict();
        let init = counts["counts"]["init"].as_u64().unwrap();
        let fit_starts = counts["counts"]["fit_start"].as_u64().unwrap();
        assert_eq!(init, 1);
        assert_eq!(fit_starts, 2);
    }

    #[test]
    fn test_repeated_fit_after_doubling_duration() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(2)));

        let first = trainer.fit().unwrap();
        assert_eq!(first.epochs_completed, 2);

        // Fitting again without extending trains nothing further
        let rerun = trainer.fit().unwrap();
        assert_eq!(rerun.epochs_completed, 2);

        let duration = trainer.state().max_duration.unwrap();
        trainer.state_mut().max_duration = Some(duration * 2);
        let second = trainer.fit().unwrap();
        assert_eq!(second.epochs_completed, 4);
        assert!(!second.stopped_early);
    }

    #[test]
    fn test_missing_duration_errors() {
        let mut trainer = trainer_with(TrainerConfig::new());
        trainer.state_mut().max_duration = None;
        assert!(matches!(trainer.fit(), Err(TrainerError::MissingDuration)));
    }

    #[test]
    fn test_early_stopper_stops_fit() {
        let mut trainer = Trainer::new(
            Box::new(LinearModel::new(1)),
            loader(2, 2),
            TrainerConfig::new()
                .with_max_duration(Time::epochs(100))
                // Zero learning rate: loss is flat, the stopper must fire
                .with_learning_rate(0.0),
        );
        trainer.add_callback(EarlyStopper::new(2, 0.0001));

        let summary = trainer.fit().unwrap();
        assert!(summary.stopped_early);
        assert!(summary.epochs_completed < 100);
    }

    #[test]
    fn test_stop_at_fit_start_still_fires_fit_end() {
        struct StopImmediately;
        impl Callback for StopImmediately {
            fn fit_start(&mut self, _: &crate::core::EventContext) -> CallbackAction {
                CallbackAction::Stop
            }
            fn name(&self) -> &'static str {
                "StopImmediately"
            }
        }

        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(5)));
        trainer.add_callback(StopImmediately);
        trainer.add_callback(EventCounter::new());

        let summary = trainer.fit().unwrap();
        assert!(summary.stopped_early);
        assert_eq!(summary.epochs_completed, 0);

        let counts = trainer.state().callbacks()[1].state_dict();
        assert_eq!(counts["counts"]["fit_end"].as_u64(), Some(1));
    }

    #[test]
    fn test_skip_epoch_counts_toward_duration() {
        struct SkipAll;
        impl Callback for SkipAll {
            fn epoch_start(&mut self, _: &crate::core::EventContext) -> CallbackAction {
                CallbackAction::SkipEpoch
            }
            fn name(&self) -> &'static str {
                "SkipAll"
            }
        }

        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(3)));
        trainer.add_callback(SkipAll);

        let summary = trainer.fit().unwrap();
        assert_eq!(summary.epochs_completed, 3);
        assert_eq!(summary.batches_completed, 0);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn test_profiler_schedule_consulted_per_batch() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(2)));
        trainer.set_profiler(Profiler::skip_all());

        trainer.fit().unwrap();

        let profiler = trainer.state().profiler().unwrap();
        assert!(profiler.is_bound());
        assert_eq!(profiler.times_taken(ProfilerAction::Skip), 8);
        assert_eq!(profiler.times_taken(ProfilerAction::Active), 0);
    }

    #[test]
    fn test_batch_duration_stops_mid_epoch() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::batches(3)));

        let summary = trainer.fit().unwrap();
        assert_eq!(summary.batches_completed, 3);
        assert!(!summary.stopped_early);
    }

    #[test]
    fn test_eval_pass_sets_val_loss() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(1)));
        trainer.set_eval_data(loader(2, 2));
        trainer.add_callback(EventCounter::new());

        trainer.fit().unwrap();
        assert!(trainer.state().val_loss.is_some());

        let counts = trainer.state().callbacks()[0].state_dict();
        assert_eq!(counts["counts"]["eval_start"].as_u64(), Some(1));
        assert_eq!(counts["counts"]["eval_batch_start"].as_u64(), Some(2));
        assert_eq!(counts["counts"]["eval_end"].as_u64(), Some(1));
    }

    #[test]
    fn test_metrics_flow_to_destinations() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(1)));
        let logs = MemoryLogger::new();
        trainer.add_destination(logs.clone());

        trainer.fit().unwrap();

        assert_eq!(trainer.logger().len(), 1);
        assert_eq!(logs.fit_starts(), 1);
        assert_eq!(logs.fit_ends(), 1);
        assert_eq!(logs.metric_values("train/loss").len(), 4);
        assert_eq!(
            logs.hyperparameters().get("max_duration").map(String::as_str),
            Some("1ep")
        );
    }

    #[test]
    fn test_checkpoint_save_and_restore() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckpt.json");

        let mut trainer = trainer_with(
            TrainerConfig::new()
                .with_max_duration(Time::epochs(2))
                .with_learning_rate(0.1),
        );
        trainer.fit().unwrap();
        trainer.save_checkpoint(&path).unwrap();
        let trained_epoch = trainer.state().timestamp.epoch;

        let mut resumed = Trainer::new(
            Box::new(LinearModel::new(1)),
            loader(4, 2),
            TrainerConfig::new()
                .with_max_duration(Time::epochs(2))
                .with_load_path(&path),
        );
        resumed.add_callback(EventCounter::new());

        // Restored timestamp already satisfies max_duration: nothing
        // more trains, but the load events fire.
        let summary = resumed.fit().unwrap();
        assert_eq!(summary.epochs_completed, trained_epoch);

        let counts = resumed.state().callbacks()[0].state_dict();
        assert_eq!(counts["counts"]["before_load"].as_u64(), Some(1));
        assert_eq!(counts["counts"]["after_load"].as_u64(), Some(1));
    }

    #[test]
    fn test_close_twice_via_fresh_engines() {
        let mut trainer = trainer_with(TrainerConfig::new().with_max_duration(Time::epochs(1)));
        trainer.add_callback(EventCounter::new());

        trainer.fit().unwrap();
        trainer.close();
        trainer.close();

        let counts = trainer.state().callbacks()[0].state_dict();
        assert_eq!(counts["close_calls"].as_u64(), Some(2));
        assert_eq!(counts["post_close_calls"].as_u64(), Some(2));
    }

    #[test]
    fn test_lr_monitor_sees_configured_rate() {
        let mut trainer = trainer_with(
            TrainerConfig::new()
                .with_max_duration(Time::epochs(1))
                .with_learning_rate(0.25),
        );
        trainer.add_callback(LrMonitor::new());

        trainer.fit().unwrap();

        let history = trainer.state().callbacks()[0].state_dict();
        let values = history["history"].as_array().unwrap();
        assert_eq!(values.len(), 4);
        assert!(values.iter().all(|v| (v.as_f64().unwrap() - 0.25).abs() < 1e-6));
    }
}
