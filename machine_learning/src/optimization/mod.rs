mod prox;
mod schedule;
mod sgd;
mod updater;

pub use prox::{shrink_norm, soft_threshold};
pub use schedule::DecaySchedule;
pub use sgd::SgdUpdater;
pub use updater::Updater;
