pub mod dataset;
pub mod engine;
pub mod error;
pub mod initialization;
pub mod model;
pub mod optimization;
pub mod stats;

pub use dataset::{Dataset, Minibatch};
pub use engine::ProtocolEngine;
pub use error::{MlErr, Result};
pub use model::{LinearModel, LossEval, Model};
pub use optimization::{DecaySchedule, SgdUpdater, Updater};
pub use stats::{LossSample, TrainStatistics};
