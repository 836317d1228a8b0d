use comms::specs::Penalty;

use crate::{Minibatch, Model, Result};

/// The update rule of a training run.
///
/// The coordinator applies gradients in arrival order, which is only reproducible when
/// `apply_gradient` is a pure additive step. Implementations that keep per call state
/// (momentum, adaptive rates) make runs depend on the arrival order of gradients.
pub trait Updater<M: Model> {
    /// Called once before the first round of each epoch.
    fn on_epoch_start(&mut self) {}

    /// Called once after the last round of each epoch.
    fn on_epoch_end(&mut self) {}

    /// Computes the gradient of the loss over `batch` at the model's current parameters.
    ///
    /// # Arguments
    /// * `model` - The model to differentiate.
    /// * `batch` - The examples to compute the gradient over.
    /// * `grad` - Where to write the gradient, must be `D` long.
    fn compute_gradient(&mut self, model: &M, batch: Minibatch<'_>, grad: &mut [f32]) -> Result<()>;

    /// Applies a gradient to the model.
    ///
    /// # Arguments
    /// * `model` - The model to update.
    /// * `grad` - A `D` long gradient.
    /// * `learning_rate` - The step size for this epoch.
    fn apply_gradient(&mut self, model: &mut M, grad: &[f32], learning_rate: f32) -> Result<()>;

    /// Applies the proximal operator of `penalty`.
    ///
    /// # Arguments
    /// * `model` - The model to regularize.
    /// * `penalty` - Which operator to run, as configured for the run.
    /// * `strength` - The already scaled strength, usually `learning_rate * lambda`.
    fn apply_regularizer(&mut self, model: &mut M, penalty: Penalty, strength: f32);
}
