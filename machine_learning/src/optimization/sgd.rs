use comms::specs::Penalty;
use ndarray::Array1;

use super::{Updater, shrink_norm, soft_threshold};
use crate::{LinearModel, MlErr, Minibatch, Model, Result};

/// Plain stochastic gradient descent on the log-loss of a `LinearModel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SgdUpdater;

impl SgdUpdater {
    fn check_len(what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(MlErr::SizeMismatch {
                a: what,
                b: "params",
                got,
                expected,
            });
        }

        Ok(())
    }
}

impl Updater<LinearModel> for SgdUpdater {
    fn compute_gradient(
        &mut self,
        model: &LinearModel,
        batch: Minibatch<'_>,
        grad: &mut [f32],
    ) -> Result<()> {
        Self::check_len("grad", grad.len(), model.num_params())?;

        if batch.is_empty() {
            grad.fill(0.);
            return Ok(());
        }

        let margins = model.margins(batch.features)?;
        let n = batch.len() as f32;

        // d/dm ln(1 + e^{-y m}) = -y / (1 + e^{y m})
        let coeffs: Array1<f32> = margins
            .iter()
            .zip(batch.labels)
            .map(|(&m, &y)| -y / (1. + (y * m).exp()) / n)
            .collect();

        let full = batch.features.t().dot(&coeffs);
        for (g, v) in grad.iter_mut().zip(full.iter()) {
            *g = *v;
        }

        Ok(())
    }

    fn apply_gradient(&mut self, model: &mut LinearModel, grad: &[f32], learning_rate: f32) -> Result<()> {
        Self::check_len("grad", grad.len(), model.num_params())?;

        for (p, g) in model.params_mut().iter_mut().zip(grad) {
            *p -= learning_rate * g;
        }

        Ok(())
    }

    fn apply_regularizer(&mut self, model: &mut LinearModel, penalty: Penalty, strength: f32) {
        match penalty {
            Penalty::L1 { .. } => soft_threshold(model.params_mut(), strength),
            Penalty::TraceNorm { .. } => shrink_norm(model.params_mut(), strength),
        }
    }
}
