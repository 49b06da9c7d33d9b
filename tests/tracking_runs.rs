//! Integration tests for experiment tracking and active-run hygiene

use std::sync::{Mutex, MutexGuard, PoisonError};

use ensayar::core::Time;
use ensayar::callbacks::TrackerDestination;
use ensayar::profiler::Profiler;
use ensayar::tracking::storage::{InMemoryBackend, JsonFileBackend};
use ensayar::tracking::{
    active_run, active_run_count, clear_active_runs, ExperimentTracker, RunStatus, TrackingError,
};
use ensayar::train::{synthetic, DataLoader, LinearModel, Trainer, TrainerConfig};

static ACTIVE_RUN_FIXTURE: Mutex<()> = Mutex::new(());

fn clean_runs() -> MutexGuard<'static, ()> {
    let guard = ACTIVE_RUN_FIXTURE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    clear_active_runs();
    guard
}

fn small_trainer() -> Trainer {
    let batches = synthetic::regression_batches(3, 2, 1, 0.05, 5);
    let mut trainer = Trainer::new(
        Box::new(LinearModel::new(1)),
        DataLoader::from_batches(batches),
        TrainerConfig::new()
            .with_max_duration(Time::epochs(2))
            .with_learning_rate(0.1),
    );
    trainer.set_profiler(Profiler::skip_all());
    trainer
}

#[test]
fn training_records_a_completed_run() {
    let _fixture = clean_runs();

    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new("integration", JsonFileBackend::new(dir.path()));
    let mut trainer = small_trainer();
    trainer.add_destination(TrackerDestination::new(tracker));

    trainer.fit().unwrap();

    // The run ended at fit end, so nothing is left active and the
    // persisted record carries the metric stream.
    assert_eq!(active_run_count(), 0);
    let reader = ExperimentTracker::new("integration", JsonFileBackend::new(dir.path()));
    let runs = reader.list_runs().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Completed);
    assert_eq!(runs[0].metrics.get("train/loss").unwrap().len(), 6);
    assert_eq!(runs[0].params.get("max_duration").unwrap(), "2ep");

    clear_active_runs();
}

#[test]
fn repeated_fits_record_one_run_each() {
    let _fixture = clean_runs();

    let dir = tempfile::tempdir().unwrap();
    let tracker = ExperimentTracker::new("refit", JsonFileBackend::new(dir.path()));
    let mut trainer = small_trainer();
    trainer.add_destination(TrackerDestination::new(tracker));

    trainer.fit().unwrap();
    let duration = trainer.state().max_duration.unwrap();
    trainer.state_mut().max_duration = Some(duration * 2);
    trainer.fit().unwrap();

    let reader = ExperimentTracker::new("refit", JsonFileBackend::new(dir.path()));
    assert_eq!(reader.list_runs().unwrap().len(), 2);
    assert_eq!(active_run_count(), 0);

    clear_active_runs();
}

#[test]
fn stale_active_run_blocks_then_cleanup_unblocks() {
    let _fixture = clean_runs();

    // Simulate a test that crashed mid-run and never ended it
    let mut stale = ExperimentTracker::new("stale", InMemoryBackend::new());
    stale.start_run(None).unwrap();
    assert!(active_run().is_some());

    let mut blocked = ExperimentTracker::new("blocked", InMemoryBackend::new());
    assert!(matches!(
        blocked.start_run(None),
        Err(TrackingError::RunAlreadyActive(_))
    ));

    // Forced cleanup is best-effort and repeatable
    clear_active_runs();
    clear_active_runs();
    assert!(blocked.start_run(None).is_ok());

    clear_active_runs();
}

#[test]
fn trainer_close_cancels_run_left_active() {
    let _fixture = clean_runs();

    let tracker = ExperimentTracker::new("cancelled", InMemoryBackend::new());
    let mut trainer = small_trainer();
    trainer.add_destination(TrackerDestination::new(tracker));

    // Interrupt after the first epoch by stopping from a callback
    struct StopAfterFirstEpoch;
    impl ensayar::core::Callback for StopAfterFirstEpoch {
        fn epoch_end(
            &mut self,
            _: &ensayar::core::EventContext,
        ) -> ensayar::core::CallbackAction {
            ensayar::core::CallbackAction::Stop
        }
        fn name(&self) -> &'static str {
            "StopAfterFirstEpoch"
        }
    }
    trainer.add_callback(StopAfterFirstEpoch);

    let summary = trainer.fit().unwrap();
    assert!(summary.stopped_early);

    // Fit end still fired, so the run completed rather than leaking;
    // closing afterwards stays safe.
    assert_eq!(active_run_count(), 0);
    trainer.close();
    trainer.close();

    clear_active_runs();
}
