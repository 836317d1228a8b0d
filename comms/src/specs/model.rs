use std::{num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

/// How the model vector is filled before the first round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f32 },
    Normal { mean: f32, std_dev: f32, seed: u64 },
}

impl Default for InitSpec {
    fn default() -> Self {
        Self::Const { value: 0. }
    }
}

/// The model every process of the run agrees on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// The parameter count `D`.
    pub num_params: NonZeroUsize,
    #[serde(default)]
    pub init: InitSpec,
    /// Where the coordinator persists the trained model.
    #[serde(default)]
    pub output: Option<PathBuf>,
}
