mod error;
mod model;
mod report;
mod run;
mod training;

pub use error::SpecErr;
pub use model::{InitSpec, ModelSpec};
pub use report::WorkerReport;
pub use run::RunSpec;
pub use training::{Penalty, TrainingSpec};
