//! Core lifecycle types: events, callbacks, state, engine, and time
//!
//! The contract these types pin down:
//! - [`Event`] is a closed set; [`Callback`] has exactly one handler per
//!   variant, enforced by the exhaustive dispatch in
//!   [`Callback::run_event`].
//! - [`Engine::run_event`] delivers an event to every callback in a
//!   [`State`] exactly once, in registration order.
//! - `close`/`post_close` are idempotent; a closed engine rejects
//!   events, and a new engine over the same state resumes dispatch.

mod callback;
mod engine;
mod event;
mod state;
mod time;

pub use callback::{Callback, CallbackAction, EventContext};
pub use engine::{Engine, EngineError};
pub use event::{Event, ParseEventError};
pub use state::State;
pub use time::{ParseTimeError, Time, TimeUnit, Timestamp};
