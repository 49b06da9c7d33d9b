//! Event invocation counter
//!
//! `EventCounter` implements every handler of the [`Callback`] trait
//! and counts invocations per event. One counter per handler is what
//! makes the one-method-per-event contract observable: dispatching an
//! event exactly once must leave exactly one count behind.

use std::collections::HashMap;

use crate::core::{Callback, CallbackAction, Event, EventContext};

/// Callback that counts how many times each handler ran.
#[derive(Debug, Default)]
pub struct EventCounter {
    counts: HashMap<Event, u64>,
    close_calls: u64,
    post_close_calls: u64,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self, event: Event) -> CallbackAction {
        *self.counts.entry(event).or_insert(0) += 1;
        CallbackAction::Continue
    }

    /// Invocations recorded for `event`.
    pub fn count(&self, event: Event) -> u64 {
        self.counts.get(&event).copied().unwrap_or(0)
    }

    /// Total invocations across all events.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn close_calls(&self) -> u64 {
        self.close_calls
    }

    pub fn post_close_calls(&self) -> u64 {
        self.post_close_calls
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        self.close_calls = 0;
        self.post_close_calls = 0;
    }
}

impl Callback for EventCounter {
    fn init(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::Init)
    }

    fn before_load(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BeforeLoad)
    }

    fn after_load(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::AfterLoad)
    }

    fn fit_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::FitStart)
    }

    fn epoch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EpochStart)
    }

    fn batch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BatchStart)
    }

    fn before_forward(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BeforeForward)
    }

    fn after_forward(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::AfterForward)
    }

    fn before_backward(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BeforeBackward)
    }

    fn after_backward(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::AfterBackward)
    }

    fn batch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BatchEnd)
    }

    fn batch_checkpoint(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::BatchCheckpoint)
    }

    fn epoch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EpochEnd)
    }

    fn epoch_checkpoint(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EpochCheckpoint)
    }

    fn eval_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EvalStart)
    }

    fn eval_batch_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EvalBatchStart)
    }

    fn eval_batch_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EvalBatchEnd)
    }

    fn eval_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::EvalEnd)
    }

    fn fit_end(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.bump(Event::FitEnd)
    }

    fn close(&mut self) {
        self.close_calls += 1;
    }

    fn post_close(&mut self) {
        self.post_close_calls += 1;
    }

    fn state_dict(&self) -> serde_json::Value {
        let counts: HashMap<&'static str, u64> =
            self.counts.iter().map(|(e, n)| (e.name(), *n)).collect();
        serde_json::json!({
            "counts": counts,
            "close_calls": self.close_calls,
            "post_close_calls": self.post_close_calls,
        })
    }

    fn load_state_dict(&mut self, state: &serde_json::Value) {
        if let Some(counts) = state.get("counts").and_then(|c| c.as_object()) {
            self.counts.clear();
            for (name, value) in counts {
                if let (Ok(event), Some(n)) = (name.parse::<Event>(), value.as_u64()) {
                    self.counts.insert(event, n);
                }
            }
        }
        if let Some(n) = state.get("close_calls").and_then(|v| v.as_u64()) {
            self.close_calls = n;
        }
        if let Some(n) = state.get("post_close_calls").and_then(|v| v.as_u64()) {
            self.post_close_calls = n;
        }
    }

    fn name(&self) -> &'static str {
        "EventCounter"
    }
}
