//! Early stopping callback

use crate::core::{Callback, CallbackAction, EventContext};

/// Stops training when the monitored loss plateaus.
///
/// Watches epoch-end loss (validation loss when available) and returns
/// [`CallbackAction::Stop`] after `patience` epochs without an
/// improvement of at least `min_delta`. State resets at each fit start,
/// so repeated fit calls each get a fresh patience window.
///
/// # Example
///
/// ```
/// use ensayar::callbacks::EarlyStopper;
///
/// // Stop after 5 epochs without improving by at least 0.001
/// let stopper = EarlyStopper::new(5, 0.001);
/// ```
#[derive(Clone, Debug)]
pub struct EarlyStopper {
    patience: u64,
    min_delta: f32,
    best_loss: f32,
    epochs_without_improvement: u64,
}

impl EarlyStopper {
    pub fn new(patience: u64, min_delta: f32) -> Self {
        Self {
            patience,
            min_delta,
            best_loss: f32::INFINITY,
            epochs_without_improvement: 0,
        }
    }

    /// Clear the improvement history.
    pub fn reset(&mut self) {
        self.best_loss = f32::INFINITY;
        self.epochs_without_improvement = 0;
    }

    pub fn epochs_without_improvement(&self) -> u64 {
        self.epochs_without_improvement
    }

    fn observe(&mut self, loss: f32) {
        if loss < self.best_loss - self.min_delta {
            self.best_loss = loss;
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
        }
    }
}

impl Callback for EarlyStopper {
    fn fit_start(&mut self, _ctx: &EventContext) -> CallbackAction {
        self.reset();
        CallbackAction::Continue
    }

    fn epoch_end(&mut self, ctx: &EventContext) -> CallbackAction {
        let Some(loss) = ctx.val_loss.or(ctx.loss) else {
            return CallbackAction::Continue;
        };
        self.observe(loss);

        if self.epochs_without_improvement >= self.patience {
            eprintln!(
                "early stopping: no improvement for {} epochs (best loss: {:.4})",
                self.patience, self.best_loss
            );
            CallbackAction::Stop
        } else {
            CallbackAction::Continue
        }
    }

    fn state_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "best_loss": self.best_loss,
            "epochs_without_improvement": self.epochs_without_improvement,
        })
    }

    fn load_state_dict(&mut self, state: &serde_json::Value) {
        if let Some(best) = state.get("best_loss").and_then(|v| v.as_f64()) {
            self.best_loss = best as f32;
        }
        if let Some(n) = state.get("epochs_without_improvement").and_then(|v| v.as_u64()) {
            self.epochs_without_improvement = n;
        }
    }

    fn name(&self) -> &'static str {
        "EarlyStopper"
    }
}
