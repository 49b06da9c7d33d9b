//! Console progress reporting callback

use crate::core::{Callback, CallbackAction, EventContext};

/// Prints training progress to stdout.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    /// Print a line every N batches
    log_interval: u64,
}

impl ProgressReporter {
    pub fn new(log_interval: u64) -> Self {
        Self { log_interval: log_interval.max(1) }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Callback for ProgressReporter {
    fn epoch_start(&mut self, ctx: &EventContext) -> CallbackAction {
        let duration = ctx
            .max_duration
            .map(|d| d.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!("epoch {} of {duration} starting (lr: {:.2e})", ctx.epoch + 1, ctx.lr);
        CallbackAction::Continue
    }

    fn batch_end(&mut self, ctx: &EventContext) -> CallbackAction {
        if ctx.batch_in_epoch > 0 && ctx.batch_in_epoch % self.log_interval == 0 {
            if let Some(loss) = ctx.loss {
                println!("  batch {}: loss {loss:.4}", ctx.batch_in_epoch);
            }
        }
        CallbackAction::Continue
    }

    fn epoch_end(&mut self, ctx: &EventContext) -> CallbackAction {
        let val = ctx
            .val_loss
            .map(|v| format!(", val_loss: {v:.4}"))
            .unwrap_or_default();
        let loss = ctx.loss.unwrap_or(f32::NAN);
        println!(
            "epoch {}: loss {loss:.4}{val} ({:.1}s)",
            ctx.epoch + 1,
            ctx.elapsed_secs
        );
        CallbackAction::Continue
    }

    fn name(&self) -> &'static str {
        "ProgressReporter"
    }
}
