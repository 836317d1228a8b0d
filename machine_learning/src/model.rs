use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};

use comms::specs::ModelSpec;
use log::info;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::Serialize;

use crate::{Dataset, MlErr, Result, initialization::init_params};

/// The evaluation of a model over a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossEval {
    /// Mean loss per example.
    pub loss: f64,
    /// Mean evaluation metric per example.
    pub metric: f64,
}

/// A model whose state is a flat vector of parameters.
pub trait Model {
    /// The parameter count `D`.
    fn num_params(&self) -> usize;

    /// The current parameter vector.
    fn params(&self) -> &[f32];

    /// The parameter vector, for in place updates.
    fn params_mut(&mut self) -> &mut [f32];

    /// Evaluates the model over every example of `dataset`.
    ///
    /// # Arguments
    /// * `dataset` - The examples to evaluate on.
    ///
    /// # Returns
    /// The mean loss and metric, or an error if the dataset doesn't fit the model.
    fn compute_loss(&self, dataset: &Dataset) -> Result<LossEval>;

    /// Stores the model wherever it's configured to live.
    fn persist(&self) -> Result<()>;
}

/// Numerically stable `ln(1 + e^z)`.
fn softplus(z: f64) -> f64 {
    if z > 0. {
        z + (-z).exp().ln_1p()
    } else {
        z.exp().ln_1p()
    }
}

#[derive(Serialize)]
struct Persisted<'a> {
    params: &'a [f32],
}

/// Logistic regression over `D` weights, labels in `{-1, +1}`.
///
/// The loss is the mean log-loss and the metric is the classification accuracy.
#[derive(Debug, Clone)]
pub struct LinearModel {
    params: Vec<f32>,
    output: Option<PathBuf>,
}

impl LinearModel {
    /// Creates a new `LinearModel` with the given weights.
    ///
    /// # Arguments
    /// * `params` - The initial weights.
    pub fn new(params: Vec<f32>) -> Self {
        Self {
            params,
            output: None,
        }
    }

    /// Creates the model described by `spec`, initialized as it says.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let params = init_params(&spec.init, spec.num_params.get())?;

        Ok(Self {
            params,
            output: spec.output.clone(),
        })
    }

    /// Sets the path `persist` writes to.
    pub fn with_output(mut self, output: PathBuf) -> Self {
        self.output = Some(output);
        self
    }

    /// Computes `x · w` for every row of `features`.
    ///
    /// # Returns
    /// The margins, or a `SizeMismatch` if the rows aren't `D` wide.
    pub fn margins(&self, features: ArrayView2<'_, f32>) -> Result<Array1<f32>> {
        if features.ncols() != self.params.len() {
            return Err(MlErr::SizeMismatch {
                a: "features",
                b: "params",
                got: features.ncols(),
                expected: self.params.len(),
            });
        }

        Ok(features.dot(&ArrayView1::from(self.params.as_slice())))
    }
}

impl Model for LinearModel {
    fn num_params(&self) -> usize {
        self.params.len()
    }

    fn params(&self) -> &[f32] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    fn compute_loss(&self, dataset: &Dataset) -> Result<LossEval> {
        let batch = dataset.all();
        let margins = self.margins(batch.features)?;

        let (loss, hits) = margins
            .iter()
            .zip(batch.labels)
            .fold((0., 0usize), |(loss, hits), (&m, &y)| {
                let signed = f64::from(m * y);
                (loss + softplus(-signed), hits + usize::from(signed > 0.))
            });

        let n = batch.len() as f64;
        Ok(LossEval {
            loss: loss / n,
            metric: hits as f64 / n,
        })
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.output else {
            return Ok(());
        };

        let mut writer = BufWriter::new(File::create(path)?);
        let persisted = Persisted {
            params: &self.params,
        };

        serde_json::to_writer(&mut writer, &persisted).map_err(std::io::Error::from)?;
        writer.flush()?;

        info!(path:? = path, params = self.params.len(); "model persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dataset() -> Dataset {
        Dataset::new(
            array![[1., 0.], [0., 1.], [-1., 0.], [0., -1.]],
            array![1., 1., -1., -1.],
        )
        .unwrap()
    }

    #[test]
    fn zero_model_has_log_two_loss() {
        let model = LinearModel::new(vec![0., 0.]);
        let eval = model.compute_loss(&dataset()).unwrap();

        assert!((eval.loss - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(eval.metric, 0.);
    }

    #[test]
    fn separating_model_is_accurate() {
        let model = LinearModel::new(vec![10., 10.]);
        let eval = model.compute_loss(&dataset()).unwrap();

        assert_eq!(eval.metric, 1.);
        assert!(eval.loss < 1e-4);
    }

    #[test]
    fn width_mismatch_is_reported() {
        let model = LinearModel::new(vec![0.; 3]);
        let err = model.compute_loss(&dataset()).unwrap_err();
        assert!(matches!(
            err,
            MlErr::SizeMismatch {
                got: 2,
                expected: 3,
                ..
            }
        ));
    }

    #[test]
    fn softplus_is_stable() {
        assert!((softplus(0.) - std::f64::consts::LN_2).abs() < 1e-12);
        assert_eq!(softplus(1000.), 1000.);
        assert!(softplus(-1000.) >= 0.);
    }

    #[test]
    fn persist_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = LinearModel::new(vec![1.5, -2.]).with_output(path.clone());
        model.persist().unwrap();

        let text = std::fs::read_to_string(path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["params"], serde_json::json!([1.5, -2.0]));
    }

    #[test]
    fn persist_without_output_is_a_noop() {
        assert!(LinearModel::new(vec![1.]).persist().is_ok());
    }
}
