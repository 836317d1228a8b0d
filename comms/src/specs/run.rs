use std::{fs::File, io::BufReader, path::Path};

use serde::{Deserialize, Serialize};

use super::{ModelSpec, SpecErr, TrainingSpec};

/// The whole configuration document of a run, shared verbatim by every process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSpec {
    pub training: TrainingSpec,
    pub model: ModelSpec,
}

impl RunSpec {
    /// Reads and validates a run specification from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path of the JSON document.
    ///
    /// # Returns
    /// The parsed specification or a `SpecErr` describing what is wrong with it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SpecErr> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| SpecErr::unreadable(path, e))?;
        let spec: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| SpecErr::unreadable(path, e))?;

        spec.training.validate()?;
        Ok(spec)
    }
}
