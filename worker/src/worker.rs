use std::time::Instant;

use comms::{ControlFlags, MsgReceiver, MsgSender, specs::WorkerReport};
use log::{debug, info, warn};
use machine_learning::{Dataset, Model, ProtocolEngine, TrainStatistics, Updater};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{CoordinatorClient, Result, WindowSampler, WorkerErr, WorkerPhase};

/// The training side of a bounded staleness run.
///
/// Owns a private replica of the model, replaced as a whole by every model message,
/// and turns random windows of its dataset into gradients for the coordinator.
pub struct Worker<M, U, R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    model: M,
    updater: U,
    dataset: Dataset,
    client: CoordinatorClient<R, W>,
    sampler: WindowSampler,
    grad: Vec<f32>,
    stats: TrainStatistics,
    epoch: usize,
    pending: ControlFlags,
}

impl<M, U, R, W> Worker<M, U, R, W>
where
    M: Model,
    U: Updater<M>,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Worker`.
    ///
    /// # Arguments
    /// * `mini_batch` - The width of the sampled windows.
    /// * `model` - The local replica, initialized like the coordinator's model.
    /// * `updater` - Computes the gradients.
    /// * `dataset` - This worker's examples.
    /// * `rx` - The receiving end of the coordinator connection.
    /// * `tx` - The sending end of the coordinator connection.
    ///
    /// # Returns
    /// A worker ready to join, or `ConfigMismatch` if the dataset doesn't fit the model.
    pub fn new(
        mini_batch: usize,
        model: M,
        updater: U,
        dataset: Dataset,
        rx: MsgReceiver<R>,
        tx: MsgSender<W>,
    ) -> Result<Self> {
        if dataset.num_features() != model.num_params() {
            return Err(WorkerErr::ConfigMismatch {
                detail: format!(
                    "dataset has {} features but the model has {} parameters",
                    dataset.num_features(),
                    model.num_params()
                ),
            });
        }

        Ok(Self {
            grad: vec![0.; model.num_params()],
            model,
            updater,
            dataset,
            client: CoordinatorClient::new(rx, tx),
            sampler: WindowSampler::new(mini_batch),
            stats: TrainStatistics::default(),
            epoch: 0,
            pending: ControlFlags::default(),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn statistics(&self) -> &TrainStatistics {
        &self.stats
    }

    /// Joins the run and trains until the coordinator says it is over.
    ///
    /// Local failures are reported to the coordinator before being returned.
    pub async fn train(&mut self) -> Result<()> {
        let worker_id = self.client.join(self.model.num_params()).await?;
        info!(worker_id = worker_id; "joined the run");

        if let Err(err) = self.drive(worker_id).await {
            if matches!(err, WorkerErr::Ml(_)) {
                warn!(worker_id = worker_id; "aborting: {err}");
                self.client.abort(&err.to_string()).await?;
            }

            return Err(err);
        }

        self.client.disconnect().await?;
        info!(worker_id = worker_id, epochs = self.epoch; "training finished");
        Ok(())
    }

    async fn drive(&mut self, worker_id: usize) -> Result<()> {
        let mut phase = WorkerPhase::AwaitingEpochSignal;

        loop {
            match phase {
                WorkerPhase::AwaitingEpochSignal => {
                    self.epoch_boundary(worker_id).await?;
                    self.pending.epoch_done = false;
                }
                WorkerPhase::Training if self.pending.training_done => {}
                WorkerPhase::Training => self.pending = self.step().await?,
                WorkerPhase::Terminated => return Ok(()),
            }

            phase = phase.next(self.pending);
        }
    }

    /// Contributes to the epoch boundary reduction, then starts the next epoch's updater and windows.
    async fn epoch_boundary(&mut self, worker_id: usize) -> Result<()> {
        let eval = self.model.compute_loss(&self.dataset)?;
        let examples = self.dataset.size() as f64;
        let working_time = self.stats.working_time();
        let waiting_time = self.stats.waiting_time();

        let report = WorkerReport {
            examples,
            metric_sum: eval.metric * examples,
            loss_sum: eval.loss * examples,
            working_time: working_time.as_secs_f64(),
            waiting_time: waiting_time.as_secs_f64(),
        };

        self.client.send_report(report).await?;
        self.stats
            .track((working_time + waiting_time).as_secs_f64(), eval.loss);

        debug!(worker_id = worker_id, epoch = self.epoch, loss = eval.loss; "reported");

        self.updater.on_epoch_start();
        self.sampler.reseed(self.epoch);
        self.epoch += 1;
        Ok(())
    }

    /// One gradient out, one model in.
    async fn step(&mut self) -> Result<ControlFlags> {
        let started = Instant::now();
        let window = self.sampler.next_window(self.dataset.size());
        let batch = self.dataset.minibatch(window);
        self.updater
            .compute_gradient(&self.model, batch, &mut self.grad)?;
        self.stats.add_working_time(started.elapsed());

        let started = Instant::now();
        self.client.send_gradient(&self.grad).await?;
        let flags = self.client.recv_model_into(self.model.params_mut()).await?;
        self.stats.add_waiting_time(started.elapsed());

        Ok(flags)
    }
}

impl<M, U, R, W> ProtocolEngine for Worker<M, U, R, W>
where
    M: Model + Send,
    U: Updater<M> + Send,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    type Err = WorkerErr;

    async fn run(mut self) -> std::result::Result<TrainStatistics, Self::Err> {
        self.train().await?;
        Ok(self.stats)
    }
}
