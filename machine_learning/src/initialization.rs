use comms::specs::InitSpec;
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};

use crate::{MlErr, Result};

/// Generates the initial model vector described by `spec`.
///
/// Seeded initializations are deterministic, so every process of a run that reads the
/// same specification starts from a bit-identical replica.
///
/// # Arguments
/// * `spec` - The initialization to use.
/// * `len` - The amount of parameters to generate.
///
/// # Returns
/// The parameters, or an error if the distribution is invalid.
pub fn init_params(spec: &InitSpec, len: usize) -> Result<Vec<f32>> {
    match *spec {
        InitSpec::Const { value } => Ok(vec![value; len]),
        InitSpec::Normal {
            mean,
            std_dev,
            seed,
        } => {
            let normal = Normal::new(mean, std_dev).map_err(|e| MlErr::Distribution(e.to_string()))?;
            let mut rng = StdRng::seed_from_u64(seed);
            Ok(normal.sample_iter(&mut rng).take(len).collect())
        }
    }
}
