use std::io;

use log::info;
use machine_learning::{Dataset, TrainStatistics};
use node::{NodeConfig, Role};
use tokio::{net::TcpListener, signal};

async fn start(config: NodeConfig) -> io::Result<TrainStatistics> {
    match config.role {
        Role::Coordinator => {
            let listener = TcpListener::bind(&config.addr).await?;
            info!("listening at {}", config.addr);
            node::coordinate(listener, config.run).await
        }
        Role::Worker { dataset } => {
            let dataset = Dataset::load(&dataset).map_err(worker::WorkerErr::from)?;
            info!(examples = dataset.size(); "dataset loaded");
            node::work(&config.addr, config.run, dataset).await
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = NodeConfig::from_env()?;

    tokio::select! {
        ret = start(config) => {
            let stats = ret?;
            let loss = stats.samples().last().map(|s| s.loss).unwrap_or_default();

            info!(
                loss = loss,
                time = stats.last_time(),
                working_time = stats.working_time().as_secs_f64(),
                waiting_time = stats.waiting_time().as_secs_f64();
                "run finished"
            );
        }
        _ = signal::ctrl_c() => {
            info!("received SIGTERM");
        }
    }

    Ok(())
}
