mod client;
pub mod error;
mod sampler;
mod state;
mod worker;

pub use client::CoordinatorClient;
pub use error::{Result, WorkerErr};
pub use sampler::WindowSampler;
pub use state::WorkerPhase;
pub use worker::Worker;
