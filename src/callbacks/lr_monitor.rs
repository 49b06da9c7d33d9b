//! Learning rate history callback

use crate::core::{Callback, CallbackAction, EventContext};

/// Records the learning rate at the end of every batch.
#[derive(Debug, Clone, Default)]
pub struct LrMonitor {
    history: Vec<f32>,
}

impl LrMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learning rates in batch order, across all fits.
    pub fn history(&self) -> &[f32] {
        &self.history
    }

    pub fn latest(&self) -> Option<f32> {
        self.history.last().copied()
    }
}

impl Callback for LrMonitor {
    fn batch_end(&mut self, ctx: &EventContext) -> CallbackAction {
        self.history.push(ctx.lr);
        CallbackAction::Continue
    }

    fn state_dict(&self) -> serde_json::Value {
        serde_json::json!({ "history": self.history.clone() })
    }

    fn load_state_dict(&mut self, state: &serde_json::Value) {
        if let Some(values) = state.get("history").and_then(|v| v.as_array()) {
            self.history = values
                .iter()
                .filter_map(|v| v.as_f64())
                .map(|v| v as f32)
                .collect();
        }
    }

    fn name(&self) -> &'static str {
        "LrMonitor"
    }
}
