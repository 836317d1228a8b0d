use std::fmt;

use comms::ControlFlags;

/// Where a worker stands in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Runs the epoch boundary reduction, then starts training.
    AwaitingEpochSignal,
    /// Exchanges one gradient for one model message per step.
    Training,
    Terminated,
}

impl WorkerPhase {
    /// The phase to move to, given the flags of the latest model message.
    ///
    /// A pending epoch signal is always served before the stop signal, so the worker
    /// joins the closing reduction before terminating.
    pub fn next(self, flags: ControlFlags) -> Self {
        match self {
            Self::AwaitingEpochSignal => Self::Training,
            Self::Training if flags.epoch_done => Self::AwaitingEpochSignal,
            Self::Training if flags.training_done => Self::Terminated,
            Self::Training => Self::Training,
            Self::Terminated => Self::Terminated,
        }
    }
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AwaitingEpochSignal => "awaiting epoch signal",
            Self::Training => "training",
            Self::Terminated => "terminated",
        };

        f.write_str(name)
    }
}
