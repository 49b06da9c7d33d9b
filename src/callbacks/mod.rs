//! Built-in callbacks
//!
//! Every callback here honors the framework lifecycle contract:
//! construction with default settings cannot fail, `FitStart`/`FitEnd`
//! can replay any number of times, and `close`/`post_close` are safe to
//! call repeatedly — engines are transient and each one closes its
//! callbacks again.

mod checkpoint;
mod early_stopper;
mod event_counter;
mod lr_monitor;
mod progress;
mod speed_monitor;
mod tracker;

pub use checkpoint::CheckpointSaver;
pub use early_stopper::EarlyStopper;
pub use event_counter::EventCounter;
pub use lr_monitor::LrMonitor;
pub use progress::ProgressReporter;
pub use speed_monitor::SpeedMonitor;
pub use tracker::TrackerDestination;
