//! Process-wide registry of active runs
//!
//! Tracking enforces one active run per process, the way external
//! experiment trackers do. The registry outlives any single tracker, so
//! a run left unended by one test would poison the next; test fixtures
//! call [`clear_active_runs`] before and after each case. Cleanup is
//! best-effort: it recovers from lock poisoning and is a no-op when
//! nothing is active.

use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ACTIVE_RUNS: LazyLock<Mutex<Vec<String>>> = LazyLock::new(|| Mutex::new(Vec::new()));

fn registry() -> MutexGuard<'static, Vec<String>> {
    ACTIVE_RUNS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The currently active run, if any.
pub fn active_run() -> Option<String> {
    registry().last().cloned()
}

/// Number of runs currently registered as active.
pub fn active_run_count() -> usize {
    registry().len()
}

/// Forcibly clear all active-run records.
///
/// Never fails; intended for test setup/teardown and crash recovery.
pub fn clear_active_runs() {
    registry().clear();
}

pub(crate) fn register(run_id: &str) {
    registry().push(run_id.to_string());
}

pub(crate) fn deregister(run_id: &str) {
    registry().retain(|id| id != run_id);
}

pub(crate) fn is_registered(run_id: &str) -> bool {
    registry().iter().any(|id| id == run_id)
}
