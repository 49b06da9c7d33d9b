//! Profiling schedule hook
//!
//! The profiler does not trace anything itself; it decides, per batch,
//! what the profiling machinery should do. A schedule maps the current
//! [`Timestamp`] to a [`ProfilerAction`], and the trainer consults it at
//! every batch start, counting the actions taken. Tests bind a
//! fixed-[`ProfilerAction::Skip`] schedule for determinism.

use std::collections::HashMap;
use std::fmt;

use crate::core::Timestamp;

/// What the profiler should do for one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfilerAction {
    /// Do nothing this batch
    Skip,
    /// Record without retaining, to warm up the tracer
    Warmup,
    /// Record this batch
    Active,
    /// Record this batch and flush traces afterwards
    ActiveAndSave,
}

/// Schedule function deciding the action for a given point in the run.
pub type Schedule = Box<dyn Fn(&Timestamp) -> ProfilerAction + Send>;

/// Per-batch profiling scheduler bound to a run's state.
///
/// # Example
///
/// ```
/// use ensayar::profiler::{Profiler, ProfilerAction};
///
/// let profiler = Profiler::skip_all();
/// assert!(!profiler.is_bound());
/// ```
pub struct Profiler {
    schedule: Schedule,
    bound: bool,
    counts: HashMap<ProfilerAction, u64>,
}

impl Profiler {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule, bound: false, counts: HashMap::new() }
    }

    /// Schedule that always skips. The deterministic choice for tests.
    pub fn skip_all() -> Self {
        Self::new(Box::new(|_| ProfilerAction::Skip))
    }

    /// Cyclic schedule within each epoch: `skip_first` batches skipped,
    /// then `warmup` warmup batches, then `active` recorded batches
    /// (the last of which flushes), then skip for the rest of the epoch.
    pub fn cyclic(skip_first: u64, warmup: u64, active: u64) -> Self {
        Self::new(Box::new(move |ts: &Timestamp| {
            let pos = ts.batch_in_epoch;
            if pos < skip_first {
                ProfilerAction::Skip
            } else if pos < skip_first + warmup {
                ProfilerAction::Warmup
            } else if pos < skip_first + warmup + active {
                if pos + 1 == skip_first + warmup + active {
                    ProfilerAction::ActiveAndSave
                } else {
                    ProfilerAction::Active
                }
            } else {
                ProfilerAction::Skip
            }
        }))
    }

    /// Mark the profiler as bound to a run. Called by
    /// [`State::set_profiler`](crate::core::State::set_profiler).
    pub(crate) fn bind(&mut self) {
        self.bound = true;
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Evaluate the schedule for `ts` and record the action taken.
    pub fn action_for(&mut self, ts: &Timestamp) -> ProfilerAction {
        let action = (self.schedule)(ts);
        *self.counts.entry(action).or_insert(0) += 1;
        action
    }

    /// How many times `action` has been taken so far.
    pub fn times_taken(&self, action: ProfilerAction) -> u64 {
        self.counts.get(&action).copied().unwrap_or(0)
    }
}

impl fmt::Debug for Profiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiler")
            .field("bound", &self.bound)
            .field("counts", &self.counts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_all_always_skips() {
        let mut profiler = Profiler::skip_all();
        let mut ts = Timestamp::new();
        for _ in 0..10 {
            assert_eq!(profiler.action_for(&ts), ProfilerAction::Skip);
            ts.advance_batch(1);
        }
        assert_eq!(profiler.times_taken(ProfilerAction::Skip), 10);
        assert_eq!(profiler.times_taken(ProfilerAction::Active), 0);
    }

    #[test]
    fn test_cyclic_phases() {
        let mut profiler = Profiler::cyclic(1, 1, 2);
        let mut ts = Timestamp::new();

        let mut actions = Vec::new();
        for _ in 0..5 {
            actions.push(profiler.action_for(&ts));
            ts.advance_batch(1);
        }
        assert_eq!(
            actions,
            vec![
                ProfilerAction::Skip,
                ProfilerAction::Warmup,
                ProfilerAction::Active,
                ProfilerAction::ActiveAndSave,
                ProfilerAction::Skip,
            ]
        );
    }

    #[test]
    fn test_cyclic_resets_each_epoch() {
        let mut profiler = Profiler::cyclic(0, 1, 1);
        let mut ts = Timestamp::new();

        assert_eq!(profiler.action_for(&ts), ProfilerAction::Warmup);
        ts.advance_batch(1);
        assert_eq!(profiler.action_for(&ts), ProfilerAction::ActiveAndSave);
        ts.advance_batch(1);
        ts.advance_epoch();
        assert_eq!(profiler.action_for(&ts), ProfilerAction::Warmup);
    }

    #[test]
    fn test_bound_flag() {
        let mut profiler = Profiler::skip_all();
        assert!(!profiler.is_bound());
        profiler.bind();
        assert!(profiler.is_bound());
    }
}
