//! Model abstraction and the linear reference model

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::batch::Batch;

/// A trainable model.
///
/// The trainer drives the forward/backward/update cycle; gradients
/// accumulate across microbatches between `zero_grad` and `update`, so
/// microbatched and whole-batch training take the same step.
pub trait Model: Send {
    /// Compute the mean loss for `batch`, retaining whatever the
    /// backward pass needs.
    fn forward(&mut self, batch: &Batch) -> f32;

    /// Accumulate gradients from the most recent forward pass.
    fn backward(&mut self);

    /// Apply accumulated gradients at learning rate `lr`. A no-op when
    /// nothing has accumulated.
    fn update(&mut self, lr: f32);

    /// Clear accumulated gradients and retained activations.
    fn zero_grad(&mut self);

    /// Serializable parameter snapshot.
    fn state_dict(&self) -> serde_json::Value;

    /// Restore parameters from a snapshot.
    fn load_state_dict(&mut self, state: &serde_json::Value) -> Result<(), serde_json::Error>;

    fn name(&self) -> &'static str {
        "Model"
    }
}

/// Least-squares linear regressor with analytic gradients.
///
/// `y = X·w + b`, mean-squared-error loss. Small enough to train in a
/// unit test, real enough that loss actually falls.
#[derive(Clone, Debug)]
pub struct LinearModel {
    weights: Array1<f32>,
    bias: f32,
    grad_weights: Array1<f32>,
    grad_bias: f32,
    /// Samples contributing to the accumulated gradients
    accumulated: usize,
    /// Inputs and residuals retained by the last forward pass
    retained: Option<(ndarray::Array2<f32>, Array1<f32>)>,
}

#[derive(Serialize, Deserialize)]
struct LinearModelState {
    weights: Vec<f32>,
    bias: f32,
}

impl LinearModel {
    pub fn new(num_features: usize) -> Self {
        Self {
            weights: Array1::zeros(num_features),
            bias: 0.0,
            grad_weights: Array1::zeros(num_features),
            grad_bias: 0.0,
            accumulated: 0,
            retained: None,
        }
    }

    pub fn weights(&self) -> &Array1<f32> {
        &self.weights
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }
}

impl Model for LinearModel {
    fn forward(&mut self, batch: &Batch) -> f32 {
        let predictions = batch.inputs.dot(&self.weights) + self.bias;
        let residuals = predictions - &batch.targets;
        let loss = residuals.mapv(|r| r * r).mean().unwrap_or(0.0);
        self.retained = Some((batch.inputs.clone(), residuals));
        loss
    }

    fn backward(&mut self) {
        let Some((inputs, residuals)) = self.retained.take() else {
            return;
        };
        // d/dw of sum(r^2) = 2 X^T r, normalized per sample at update
        self.grad_weights.scaled_add(2.0, &inputs.t().dot(&residuals));
        self.grad_bias += 2.0 * residuals.sum();
        self.accumulated += residuals.len();
    }

    fn update(&mut self, lr: f32) {
        if self.accumulated == 0 {
            return;
        }
        let scale = lr / self.accumulated as f32;
        self.weights.scaled_add(-scale, &self.grad_weights);
        self.bias -= scale * self.grad_bias;
    }

    fn zero_grad(&mut self) {
        self.grad_weights.fill(0.0);
        self.grad_bias = 0.0;
        self.accumulated = 0;
        self.retained = None;
    }

    fn state_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "weights": self.weights.to_vec(),
            "bias": self.bias,
        })
    }

    fn load_state_dict(&mut self, state: &serde_json::Value) -> Result<(), serde_json::Error> {
        let state: LinearModelState = serde_json::from_value(state.clone())?;
        self.weights = Array1::from_vec(state.weights);
        self.grad_weights = Array1::zeros(self.weights.len());
        self.bias = state.bias;
        self.grad_bias = 0.0;
        self.accumulated = 0;
        self.retained = None;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LinearModel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    fn identity_batch() -> Batch {
        // Targets follow y = 2x exactly
        Batch::new(
            Array2::from_shape_vec((4, 1), vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
            array![2.0, 4.0, 6.0, 8.0],
        )
    }

    #[test]
    fn test_forward_computes_mse() {
        let mut model = LinearModel::new(1);
        // Zero weights predict 0 everywhere: loss = mean(y^2)
        let loss = model.forward(&identity_batch());
        assert_relative_eq!(loss, (4.0 + 16.0 + 36.0 + 64.0) / 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_training_step_reduces_loss() {
        let mut model = LinearModel::new(1);
        let batch = identity_batch();

        let before = model.forward(&batch);
        model.backward();
        model.update(0.01);
        model.zero_grad();
        let after = model.forward(&batch);

        assert!(after < before, "{after} should be below {before}");
    }

    #[test]
    fn test_update_without_backward_is_noop() {
        let mut model = LinearModel::new(2);
        model.update(0.1);
        assert_eq!(model.bias(), 0.0);
        assert!(model.weights().iter().all(|w| *w == 0.0));
    }

    #[test]
    fn test_microbatch_gradients_match_full_batch() {
        let batch = identity_batch();

        let mut whole = LinearModel::new(1);
        whole.zero_grad();
        whole.forward(&batch);
        whole.backward();
        whole.update(0.05);

        let mut micro = LinearModel::new(1);
        micro.zero_grad();
        for mb in batch.split(1) {
            micro.forward(&mb);
            micro.backward();
        }
        micro.update(0.05);

        assert_relative_eq!(whole.weights()[0], micro.weights()[0], epsilon = 1e-5);
        assert_relative_eq!(whole.bias(), micro.bias(), epsilon = 1e-5);
    }

    #[test]
    fn test_state_dict_round_trip() {
        let mut model = LinearModel::new(2);
        let batch = Batch::new(
            Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap(),
            array![1.0, -1.0],
        );
        model.forward(&batch);
        model.backward();
        model.update(0.1);

        let dict = model.state_dict();
        let mut restored = LinearModel::new(2);
        restored.load_state_dict(&dict).unwrap();

        assert_eq!(restored.weights(), model.weights());
        assert_eq!(restored.bias(), model.bias());
    }

    #[test]
    fn test_load_state_dict_rejects_malformed() {
        let mut model = LinearModel::new(1);
        assert!(model.load_state_dict(&serde_json::json!({"nope": 1})).is_err());
    }
}
