//! ensayar — event-driven training loop framework
//!
//! A training run is a sequence of lifecycle [events](core::Event)
//! dispatched by an [engine](core::Engine) to user-extensible
//! [callbacks](core::Callback) registered in the run's
//! [state](core::State). The [trainer](train::Trainer) drives the loop;
//! [logger destinations](logging::LoggerDestination) receive both log
//! calls and lifecycle events; the [tracker](tracking) records runs
//! with explicit active-run state.
//!
//! The contract, in short:
//! - one callback handler per event variant, enforced by the exhaustive
//!   dispatch in [`core::Callback::run_event`];
//! - one invocation per registered callback per
//!   [`core::Engine::run_event`] call, in registration order;
//! - `close`/`post_close` idempotent, engines terminal after close, and
//!   a fresh engine over the same state resumes dispatch.
//!
//! # Example
//!
//! ```
//! use ensayar::callbacks::{EarlyStopper, EventCounter};
//! use ensayar::core::{Engine, Event, State, Time};
//! use ensayar::logging::Logger;
//!
//! let mut state = State::new().with_max_duration(Time::epochs(2));
//! state.add_callback(EventCounter::new());
//! state.add_callback(EarlyStopper::new(5, 0.001));
//! let mut logger = Logger::new();
//!
//! let mut engine = Engine::new(&mut state, &mut logger);
//! engine.run_event(Event::Init).unwrap();
//! engine.run_event(Event::FitStart).unwrap();
//! engine.run_event(Event::FitEnd).unwrap();
//! engine.close();
//! ```

pub mod callbacks;
pub mod core;
pub mod logging;
pub mod profiler;
pub mod tracking;
pub mod train;
