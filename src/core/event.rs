//! Lifecycle events fired during a training run
//!
//! `Event` is a closed enumeration: every point in the run lifecycle at
//! which callbacks are notified has exactly one variant here, and the
//! [`Callback`](super::callback::Callback) trait exposes exactly one
//! handler per variant. Identity is the event name; ordering between
//! events carries no meaning.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A named point in the training run lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Fired once when a run is assembled, before any training
    Init,
    /// Fired immediately before checkpoint state is restored
    BeforeLoad,
    /// Fired after checkpoint state has been restored
    AfterLoad,
    /// Start of a `fit` call
    FitStart,
    /// Start of an epoch
    EpochStart,
    /// Start of a training batch
    BatchStart,
    /// Before the forward pass of a microbatch
    BeforeForward,
    /// After the forward pass of a microbatch
    AfterForward,
    /// Before the backward pass of a microbatch
    BeforeBackward,
    /// After the backward pass of a microbatch
    AfterBackward,
    /// End of a training batch, after the parameter update
    BatchEnd,
    /// Batch-cadence checkpoint opportunity
    BatchCheckpoint,
    /// End of an epoch
    EpochEnd,
    /// Epoch-cadence checkpoint opportunity
    EpochCheckpoint,
    /// Start of an evaluation pass
    EvalStart,
    /// Start of an evaluation batch
    EvalBatchStart,
    /// End of an evaluation batch
    EvalBatchEnd,
    /// End of an evaluation pass
    EvalEnd,
    /// End of a `fit` call
    FitEnd,
}

impl Event {
    /// Every event, in canonical lifecycle order. Contains each variant
    /// exactly once.
    pub const ALL: [Event; 19] = [
        Event::Init,
        Event::BeforeLoad,
        Event::AfterLoad,
        Event::FitStart,
        Event::EpochStart,
        Event::BatchStart,
        Event::BeforeForward,
        Event::AfterForward,
        Event::BeforeBackward,
        Event::AfterBackward,
        Event::BatchEnd,
        Event::BatchCheckpoint,
        Event::EpochEnd,
        Event::EpochCheckpoint,
        Event::EvalStart,
        Event::EvalBatchStart,
        Event::EvalBatchEnd,
        Event::EvalEnd,
        Event::FitEnd,
    ];

    /// Snake_case name of the event, matching its handler method on
    /// [`Callback`](super::callback::Callback).
    pub fn name(self) -> &'static str {
        match self {
            Event::Init => "init",
            Event::BeforeLoad => "before_load",
            Event::AfterLoad => "after_load",
            Event::FitStart => "fit_start",
            Event::EpochStart => "epoch_start",
            Event::BatchStart => "batch_start",
            Event::BeforeForward => "before_forward",
            Event::AfterForward => "after_forward",
            Event::BeforeBackward => "before_backward",
            Event::AfterBackward => "after_backward",
            Event::BatchEnd => "batch_end",
            Event::BatchCheckpoint => "batch_checkpoint",
            Event::EpochEnd => "epoch_end",
            Event::EpochCheckpoint => "epoch_checkpoint",
            Event::EvalStart => "eval_start",
            Event::EvalBatchStart => "eval_batch_start",
            Event::EvalBatchEnd => "eval_batch_end",
            Event::EvalEnd => "eval_end",
            Event::FitEnd => "fit_end",
        }
    }

    /// True for events fired before the operation they bracket.
    pub fn is_before(self) -> bool {
        matches!(
            self,
            Event::BeforeLoad | Event::BeforeForward | Event::BeforeBackward
        )
    }

    /// True for events fired after the operation they bracket.
    pub fn is_after(self) -> bool {
        matches!(
            self,
            Event::AfterLoad | Event::AfterForward | Event::AfterBackward
        )
    }

    /// True for events fired during an evaluation pass.
    pub fn is_eval(self) -> bool {
        matches!(
            self,
            Event::EvalStart | Event::EvalBatchStart | Event::EvalBatchEnd | Event::EvalEnd
        )
    }

    /// True for checkpoint-opportunity events.
    pub fn is_checkpoint(self) -> bool {
        matches!(self, Event::BatchCheckpoint | Event::EpochCheckpoint)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error parsing an event name
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event name: {0}")]
pub struct ParseEventError(String);

impl FromStr for Event {
    type Err = ParseEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Event::ALL
            .iter()
            .copied()
            .find(|e| e.name() == s)
            .ok_or_else(|| ParseEventError(s.to_string()))
    }
}
