use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use comms::specs::SpecErr;
use machine_learning::MlErr;

/// The coordinator module's result type.
pub type Result<T> = std::result::Result<T, CoordinatorErr>;

/// Failures that abort a coordinator run.
#[derive(Debug)]
pub enum CoordinatorErr {
    /// A transport failure, no retry is ever attempted.
    Io(io::Error),
    ConfigMismatch {
        worker_id: usize,
        got: usize,
        expected: usize,
    },
    WorkerCount {
        joined: usize,
        expected: usize,
    },
    UnexpectedMessage {
        worker_id: usize,
        got: &'static str,
    },
    DuplicateContribution {
        worker_id: usize,
        epoch: usize,
        iteration: usize,
    },
    DuplicateReport {
        worker_id: usize,
    },
    /// Every worker connection closed while the run still expected messages.
    Disconnected,
    InvalidSpec(SpecErr),
    Ml(MlErr),
}

impl Display for CoordinatorErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::ConfigMismatch {
                worker_id,
                got,
                expected,
            } => write!(
                f,
                "worker {worker_id} announced {got} parameters, expected {expected}"
            ),
            Self::WorkerCount { joined, expected } => {
                write!(f, "{joined} workers joined, the run needs exactly {expected}")
            }
            Self::UnexpectedMessage { worker_id, got } => {
                write!(f, "unexpected message from worker {worker_id}: got {got}")
            }
            Self::DuplicateContribution {
                worker_id,
                epoch,
                iteration,
            } => write!(
                f,
                "worker {worker_id} sent two gradients in epoch {epoch}, iteration {iteration}"
            ),
            Self::DuplicateReport { worker_id } => {
                write!(f, "worker {worker_id} reported twice in the same reduction")
            }
            Self::Disconnected => write!(f, "every worker disconnected before the run ended"),
            Self::InvalidSpec(e) => write!(f, "{e}"),
            Self::Ml(e) => write!(f, "{e}"),
        }
    }
}

impl Error for CoordinatorErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::InvalidSpec(e) => Some(e),
            Self::Ml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CoordinatorErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MlErr> for CoordinatorErr {
    fn from(value: MlErr) -> Self {
        Self::Ml(value)
    }
}

impl From<SpecErr> for CoordinatorErr {
    fn from(value: SpecErr) -> Self {
        Self::InvalidSpec(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<CoordinatorErr> for io::Error {
    fn from(value: CoordinatorErr) -> Self {
        match value {
            CoordinatorErr::Io(e) => e,
            CoordinatorErr::InvalidSpec(e) => io::Error::new(io::ErrorKind::InvalidInput, e),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
