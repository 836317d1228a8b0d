use std::{env, io, path::PathBuf};

use comms::specs::RunSpec;

/// Where the coordinator listens when `ADDR` isn't set.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8765";

/// The role a process plays in the run, chosen once at start up.
#[derive(Debug, Clone, PartialEq)]
pub enum Role {
    Coordinator,
    Worker { dataset: PathBuf },
}

/// Everything a node needs to start.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub role: Role,
    /// The coordinator's socket address, bound by the coordinator and dialed by workers.
    pub addr: String,
    pub run: RunSpec,
}

impl NodeConfig {
    /// Reads the configuration from the process environment.
    ///
    /// `ROLE` and `CONFIG` are required, `DATASET` is required for workers and `ADDR`
    /// falls back to `DEFAULT_ADDR`.
    pub fn from_env() -> io::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> io::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, format!("missing variable {key}"))
            })
        };

        let role = match require("ROLE")?.as_str() {
            "coordinator" => Role::Coordinator,
            "worker" => Role::Worker {
                dataset: require("DATASET")?.into(),
            },
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("unknown role {other}, expected coordinator or worker"),
                ));
            }
        };

        let run = RunSpec::from_path(require("CONFIG")?)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        Ok(Self {
            role,
            addr: lookup("ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            run,
        })
    }
}
