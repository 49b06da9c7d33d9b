//! Event dispatch engine
//!
//! The engine is a transient orchestrator over a [`State`] and a
//! [`Logger`]: it owns nothing but a closed flag. `run_event` delivers
//! one event to every registered callback, then to every logger
//! destination, in registration order, exactly once each. After
//! `close()` the engine refuses further events; constructing a new
//! engine over the same state is the way to resume dispatch.

use super::callback::{Callback, CallbackAction};
use super::event::Event;
use super::state::State;
use crate::logging::Logger;

/// Errors from event dispatch
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is closed; construct a new engine to resume dispatch")]
    Closed,
}

/// Dispatches lifecycle events to the callbacks of a run.
///
/// # Example
///
/// ```
/// use ensayar::core::{Engine, Event, State};
/// use ensayar::callbacks::EventCounter;
/// use ensayar::logging::Logger;
///
/// let mut state = State::new();
/// state.add_callback(EventCounter::new());
/// let mut logger = Logger::new();
///
/// let mut engine = Engine::new(&mut state, &mut logger);
/// engine.run_event(Event::Init).unwrap();
/// engine.close();
/// assert!(engine.run_event(Event::FitStart).is_err());
/// ```
pub struct Engine<'a> {
    state: &'a mut State,
    logger: &'a mut Logger,
    closed: bool,
}

impl<'a> Engine<'a> {
    pub fn new(state: &'a mut State, logger: &'a mut Logger) -> Self {
        Self { state, logger, closed: false }
    }

    /// Deliver `event` to every callback and logger destination.
    ///
    /// Each callback receives exactly one invocation of exactly one
    /// handler per call. All callbacks see the event even when an
    /// earlier one votes [`CallbackAction::Stop`]; the merged action is
    /// returned for the trainer to act on.
    pub fn run_event(&mut self, event: Event) -> Result<CallbackAction, EngineError> {
        if self.closed {
            return Err(EngineError::Closed);
        }

        let ctx = self.state.snapshot();
        let mut action = CallbackAction::Continue;
        for cb in self.state.callbacks_mut() {
            action = action.merge(cb.run_event(event, &ctx));
        }
        action = action.merge(self.logger.dispatch_event(event, &ctx));
        Ok(action)
    }

    /// Close every callback and destination, then mark the engine closed.
    ///
    /// `close` runs on all callbacks before any `post_close`. Calling
    /// this again is a no-op; callbacks themselves must also tolerate a
    /// fresh engine closing them a second time.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        for cb in self.state.callbacks_mut() {
            cb.close();
        }
        for cb in self.state.callbacks_mut() {
            cb.post_close();
        }
        self.logger.close_destinations();
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        self.state
    }

    pub fn logger_mut(&mut self) -> &mut Logger {
        self.logger
    }
}
