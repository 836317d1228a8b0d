pub mod config;

use std::io;

use comms::specs::RunSpec;
use coordinator::{Coordinator, CoordinatorErr};
use log::info;
use machine_learning::{Dataset, LinearModel, ProtocolEngine, SgdUpdater, TrainStatistics};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use worker::{Worker, WorkerErr};

pub use config::{DEFAULT_ADDR, NodeConfig, Role};

/// Runs the coordinator role over TCP.
///
/// Accepts connections until the configured amount of workers joined, then trains.
///
/// # Arguments
/// * `listener` - A bound listener workers connect to.
/// * `run` - The run specification, shared with every worker.
///
/// # Returns
/// The coordinator's statistics once the model was persisted.
pub async fn coordinate(listener: TcpListener, run: RunSpec) -> io::Result<TrainStatistics> {
    let model = LinearModel::from_spec(&run.model).map_err(CoordinatorErr::from)?;
    let updater = SgdUpdater;
    let workers = run.training.workers.get();

    let mut coordinator = Coordinator::new(run.training, model, updater)?;

    while coordinator.joined() < workers {
        let (stream, addr) = listener.accept().await?;
        info!("worker connected from {addr}");

        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        coordinator.join(rx, tx).await?;
    }

    Ok(coordinator.run().await?)
}

/// Runs the worker role over TCP.
///
/// # Arguments
/// * `addr` - The coordinator's address.
/// * `run` - The run specification, shared with the coordinator.
/// * `dataset` - This worker's examples.
///
/// # Returns
/// The worker's own statistics.
pub async fn work<A: ToSocketAddrs>(addr: A, run: RunSpec, dataset: Dataset) -> io::Result<TrainStatistics> {
    let model = LinearModel::from_spec(&run.model).map_err(WorkerErr::from)?;

    let stream = TcpStream::connect(addr).await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);

    let worker = Worker::new(
        run.training.mini_batch.get(),
        model,
        SgdUpdater,
        dataset,
        rx,
        tx,
    )?;

    Ok(worker.run().await?)
}
