//! Training throughput monitor

use std::collections::VecDeque;
use std::time::Instant;

use crate::core::{Callback, CallbackAction, EventContext};

/// Tracks batches and samples per second over a rolling window.
///
/// Batch completion times are collected at `batch_end`; the window is
/// cleared at every fit start so repeated fits measure independently.
#[derive(Debug)]
pub struct SpeedMonitor {
    window: usize,
    completions: VecDeque<(Instant, u64)>,
}

impl SpeedMonitor {
    /// Measure over the last `window` batches.
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), completions: VecDeque::new() }
    }

    /// Batches per second over the current window, if at least two
    /// batches have completed.
    pub fn batches_per_sec(&self) -> Option<f64> {
        let first = self.completions.front()?.0;
        let last = self.completions.back()?.0;
        let span = last.duration_since(first).as_secs_f64();
        (self.completions.len() > 1 && span > 0.0)
            .then(|| (self.completions.len() - 1) as f64 / span)
    }

    /// Samples per second over the current window.
    pub fn samples_per_sec(&self) -> Option<f64> {
        let rate = self.batches_per_sec()?;
        let samples: u64 = self.completions.iter().skip(1).map(|(_, n)| n).sum();
        let batches = (self.completions.len() - 1) as f64;
        Some(rate * (samples as f64 / batches))
    }

    pub fn window_len(&self) -> usize {
        self.completions.len()
    }
}

impl Default for SpeedMonitor {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Callback for SpeedMonitor {
    fn fit_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.completions.clear();
        CallbackAction::Continue
    }

    fn batch_end(&mut self, ctx: &EventContext) -> CallbackAction {
        self.completions.push_back((Instant::now(), ctx.sample));
        while self.completions.len() > self.window {
            self.completions.pop_front();
        }
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "SpeedMonitor"
    }
}
