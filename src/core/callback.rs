//! The callback trait and its dispatch contract
//!
//! A `Callback` exposes exactly one handler method per [`Event`] variant.
//! The default [`Callback::run_event`] implementation is an exhaustive
//! match from event to handler, so the one-method-per-event mapping is
//! checked at compile time: adding an `Event` variant without a handler
//! does not build.
//!
//! Beyond the per-event handlers, the trait carries a fixed set of
//! lifecycle methods: `run_event`, `close`, `post_close`, `state_dict`,
//! and `load_state_dict`. `close` and `post_close` must tolerate being
//! called more than once; engines are rebuilt across close/init cycles
//! and will close their callbacks again.

use super::event::Event;
use super::time::Time;

/// Action a handler returns to steer the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Keep going
    Continue,
    /// Abandon the current epoch and move to the next
    SkipEpoch,
    /// Stop training
    Stop,
}

impl CallbackAction {
    /// Merge two actions, keeping the more drastic one. Used by the
    /// engine so every callback still sees the event even when an
    /// earlier one votes to stop.
    pub fn merge(self, other: CallbackAction) -> CallbackAction {
        match (self, other) {
            (CallbackAction::Stop, _) | (_, CallbackAction::Stop) => CallbackAction::Stop,
            (CallbackAction::SkipEpoch, _) | (_, CallbackAction::SkipEpoch) => {
                CallbackAction::SkipEpoch
            }
            _ => CallbackAction::Continue,
        }
    }
}

/// Immutable snapshot of run state handed to every handler.
///
/// Handlers react to the numbers in the snapshot and mutate only
/// themselves; the trainer applies any requested control flow through
/// the returned [`CallbackAction`].
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    /// Identifier of the current run
    pub run_id: String,
    /// Completed epochs
    pub epoch: u64,
    /// Completed batches since the start of the run
    pub batch: u64,
    /// Completed batches within the current epoch
    pub batch_in_epoch: u64,
    /// Samples seen since the start of the run
    pub sample: u64,
    /// Most recent training loss, if any batch has completed
    pub loss: Option<f32>,
    /// Most recent evaluation loss, if an eval pass has run
    pub val_loss: Option<f32>,
    /// Current learning rate
    pub lr: f32,
    /// Configured run length
    pub max_duration: Option<Time>,
    /// Samples per microbatch (0 means whole batches)
    pub microbatch_size: usize,
    /// Wall-clock seconds since the current fit began
    pub elapsed_secs: f64,
}

/// A handler notified at lifecycle events of a training run.
///
/// Every per-event method defaults to a no-op returning
/// [`CallbackAction::Continue`], so implementations only write the
/// handlers they care about.
///
/// # Example
///
/// ```
/// use ensayar::core::{Callback, CallbackAction, EventContext};
///
/// struct LossPrinter;
///
/// impl Callback for LossPrinter {
///     fn epoch_end(&mut self, ctx: &EventContext) -> CallbackAction {
///         if let Some(loss) = ctx.loss {
///             println!("epoch {} loss {:.4}", ctx.epoch, loss);
///         }
///         CallbackAction::Continue
///     }
///
///     fn name(&self) -> &'static str {
///         "LossPrinter"
///     }
/// }
/// ```
pub trait Callback: Send {
    fn init(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn before_load(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn after_load(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn fit_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn epoch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn batch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn before_forward(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn after_forward(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn before_backward(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn after_backward(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn batch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn batch_checkpoint(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn epoch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn epoch_checkpoint(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn eval_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn eval_batch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn eval_batch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn eval_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    fn fit_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        CallbackAction::Continue
    }

    /// Dispatch one event to its handler.
    ///
    /// The match is exhaustive over [`Event`], which is what pins the
    /// one-handler-per-event contract: a new variant cannot be added
    /// without extending both the trait and this dispatch table.
    fn run_event(&mut self, event: Event, ctx: &EventContext) -> CallbackAction {
        match event {
            Event::Init => self.init(ctx),
            Event::BeforeLoad => self.before_load(ctx),
            Event::AfterLoad => self.after_load(ctx),
            Event::FitStart => self.fit_start(ctx),
            Event::EpochStart => self.epoch_start(ctx),
            Event::BatchStart => self.batch_start(ctx),
            Event::BeforeForward => self.before_forward(ctx),
            Event::AfterForward => self.after_forward(ctx),
            Event::BeforeBackward => self.before_backward(ctx),
            Event::AfterBackward => self.after_backward(ctx),
            Event::BatchEnd => self.batch_end(ctx),
            Event::BatchCheckpoint => self.batch_checkpoint(ctx),
            Event::EpochEnd => self.epoch_end(ctx),
            Event::EpochCheckpoint => self.epoch_checkpoint(ctx),
            Event::EvalStart => self.eval_start(ctx),
            Event::EvalBatchStart => self.eval_batch_start(ctx),
            Event::EvalBatchEnd => self.eval_batch_end(ctx),
            Event::EvalEnd => self.eval_end(ctx),
            Event::FitEnd => self.fit_end(ctx),
        }
    }

    /// Release resources held by the callback.
    ///
    /// Must be safe to call repeatedly: engines are transient and each
    /// one closes its callbacks.
    fn close(&mut self) {}

    /// Final notification after every callback has closed. Same
    /// idempotency requirement as [`Callback::close`].
    fn post_close(&mut self) {}

    /// Serializable snapshot of callback state for checkpointing.
    fn state_dict(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Restore callback state from a checkpoint snapshot.
    fn load_state_dict(&mut self, _state: &serde_json::Value) {}

    /// Name used in diagnostics and checkpoint payloads.
    fn name(&self) -> &'static str {
        "Callback"
    }
}
