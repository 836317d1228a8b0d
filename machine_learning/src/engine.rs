use crate::TrainStatistics;

/// One role of the training protocol, driven to completion by a single call.
///
/// The coordinator and the worker implement this independently; a process picks one
/// at start up and runs it.
#[allow(unused)]
#[trait_variant::make(ProtocolEngine: Send)]
pub trait ProtocolEngineTemplate {
    /// The error that aborts the run.
    type Err;

    /// Runs the whole protocol for this role.
    ///
    /// # Returns
    /// The statistics this process gathered, or the error that stopped it.
    async fn run(self) -> Result<TrainStatistics, Self::Err>;
}
