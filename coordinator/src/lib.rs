mod admission;
mod aggregation;
mod engine;
pub mod error;
mod fabric;
mod inbox;

pub use engine::Coordinator;
pub use error::{CoordinatorErr, Result};
