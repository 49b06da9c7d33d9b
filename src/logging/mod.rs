//! Metric logging with pluggable destinations
//!
//! A [`Logger`] fans every log call out to its registered
//! [`LoggerDestination`]s in order. Destinations are full callbacks:
//! the engine delivers every lifecycle event to them after the state's
//! own callbacks, so a destination can open its sink at fit start and
//! flush it on close.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use ensayar::logging::{Logger, MemoryLogger};
//!
//! let mut logger = Logger::new();
//! logger.add_destination(MemoryLogger::new());
//!
//! let mut metrics = HashMap::new();
//! metrics.insert("train/loss".to_string(), 0.5);
//! logger.log_metrics(&metrics, 1);
//! ```

mod file;
mod memory;

pub use file::FileLogger;
pub use memory::MemoryLogger;

use std::collections::HashMap;
use std::path::Path;

use crate::core::{Callback, CallbackAction, Event, EventContext};

/// A log sink that doubles as a callback.
///
/// Implementations receive every lifecycle event through their
/// [`Callback`] impl in addition to the log calls below.
pub trait LoggerDestination: Callback {
    /// Record metric values observed at `step`.
    fn log_metrics(&mut self, metrics: &HashMap<String, f64>, step: u64);

    /// Record run hyperparameters.
    fn log_hyperparameters(&mut self, _params: &HashMap<String, String>) {}

    /// Record an artifact produced by the run.
    fn log_artifact(&mut self, _path: &Path) {}
}

/// Fan-out router over ordered logger destinations.
#[derive(Default)]
pub struct Logger {
    destinations: Vec<Box<dyn LoggerDestination>>,
}

impl Logger {
    pub fn new() -> Self {
        Self { destinations: Vec::new() }
    }

    /// Register a destination. Registration order is delivery order.
    pub fn add_destination<D: LoggerDestination + 'static>(&mut self, destination: D) {
        self.destinations.push(Box::new(destination));
    }

    /// Register an already-boxed destination.
    pub fn add_boxed_destination(&mut self, destination: Box<dyn LoggerDestination>) {
        self.destinations.push(destination);
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn log_metrics(&mut self, metrics: &HashMap<String, f64>, step: u64) {
        for dest in &mut self.destinations {
            dest.log_metrics(metrics, step);
        }
    }

    pub fn log_hyperparameters(&mut self, params: &HashMap<String, String>) {
        for dest in &mut self.destinations {
            dest.log_hyperparameters(params);
        }
    }

    pub fn log_artifact(&mut self, path: &Path) {
        for dest in &mut self.destinations {
            dest.log_artifact(path);
        }
    }

    /// Deliver a lifecycle event to every destination. Called by the
    /// engine after the state's own callbacks.
    pub(crate) fn dispatch_event(&mut self, event: Event, ctx: &EventContext) -> CallbackAction {
        let mut action = CallbackAction::Continue;
        for dest in &mut self.destinations {
            action = action.merge(dest.run_event(event, ctx));
        }
        action
    }

    /// Close every destination. Called by the engine during its own
    /// close; repeat-safe because destinations must be.
    pub(crate) fn close_destinations(&mut self) {
        for dest in &mut self.destinations {
            dest.close();
        }
        for dest in &mut self.destinations {
            dest.post_close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_out_reaches_every_destination() {
        let mut logger = Logger::new();
        logger.add_destination(MemoryLogger::new());
        logger.add_destination(MemoryLogger::new());
        assert_eq!(logger.len(), 2);

        let mut metrics = HashMap::new();
        metrics.insert("loss".to_string(), 1.0);
        logger.log_metrics(&metrics, 0);
        logger.log_metrics(&metrics, 1);
    }

    #[test]
    fn test_empty_logger_is_fine() {
        let mut logger = Logger::new();
        assert!(logger.is_empty());
        logger.log_metrics(&HashMap::new(), 0);
        logger.close_destinations();
    }

    #[test]
    fn test_dispatch_event_reaches_destinations() {
        let mut logger = Logger::new();
        logger.add_destination(MemoryLogger::new());

        let ctx = EventContext::default();
        let action = logger.dispatch_event(Event::FitStart, &ctx);
        assert_eq!(action, CallbackAction::Continue);
    }
}
