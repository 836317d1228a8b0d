use std::time::{Duration, Instant};

use comms::{
    ControlFlags, ModelFrame, MsgReceiver, MsgSender,
    specs::TrainingSpec,
};
use log::{debug, info, warn};
use machine_learning::{DecaySchedule, Model, ProtocolEngine, TrainStatistics, Updater};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    CoordinatorErr, Result,
    admission::{Admission, DelayCounters, Round},
    aggregation,
    fabric::Fabric,
    inbox::{self, Inbox},
};

/// Inbound messages buffered per worker before readers wait on the coordinator.
const QUEUE_DEPTH_PER_WORKER: usize = 4;

/// The coordinating side of a bounded staleness training run.
///
/// Owns the authoritative model, applies gradients in arrival order and decides
/// when each round closes and who gets the resulting broadcast.
pub struct Coordinator<M, U, W>
where
    W: AsyncWrite + Unpin,
{
    spec: TrainingSpec,
    model: M,
    updater: U,
    schedule: DecaySchedule,
    admission: Admission,
    delays: DelayCounters,
    fabric: Fabric<W>,
    inbox: Inbox,
    stats: TrainStatistics,
}

impl<M, U, W> Coordinator<M, U, W>
where
    M: Model,
    U: Updater<M>,
    W: AsyncWrite + Unpin,
{
    /// Creates a new `Coordinator`.
    ///
    /// # Arguments
    /// * `spec` - The training options of the run.
    /// * `model` - The authoritative model, already initialized.
    /// * `updater` - The update rule and regularizer.
    ///
    /// # Returns
    /// A coordinator waiting for its workers, or `InvalidSpec`.
    pub fn new(spec: TrainingSpec, model: M, updater: U) -> Result<Self> {
        spec.validate()?;

        let workers = spec.workers.get();
        let group_size = spec.effective_group_size();
        if group_size < spec.group_size.get() {
            warn!(
                group_size = spec.group_size.get(),
                workers = workers;
                "group size exceeds the worker count, clamping"
            );
        }

        let (queue, inbox) = inbox::queue(workers * QUEUE_DEPTH_PER_WORKER);
        let fabric = Fabric::new(queue, model.num_params(), workers);

        Ok(Self {
            schedule: DecaySchedule::new(spec.learning_rate, spec.learning_rate_decay),
            admission: Admission::new(workers, group_size, spec.max_delay.get()),
            delays: DelayCounters::new(workers),
            spec,
            model,
            updater,
            fabric,
            inbox,
            stats: TrainStatistics::default(),
        })
    }

    /// Admits a new worker, running the join handshake over its connection.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the worker's connection.
    /// * `tx` - The sending end of the worker's connection.
    ///
    /// # Returns
    /// The worker's id, or `ConfigMismatch` if it disagrees on the model dimension.
    pub async fn join<R>(&mut self, rx: MsgReceiver<R>, tx: MsgSender<W>) -> Result<usize>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        self.fabric.join(rx, tx).await
    }

    /// The amount of workers that joined so far.
    pub fn joined(&self) -> usize {
        self.fabric.joined()
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn statistics(&self) -> &TrainStatistics {
        &self.stats
    }

    /// Runs every epoch of the run, persists the model and waits for the workers to leave.
    ///
    /// Blocks for as long as a needed worker stays silent, there is no deadline.
    pub async fn train(&mut self) -> Result<()> {
        let workers = self.spec.workers.get();
        if self.joined() != workers {
            return Err(CoordinatorErr::WorkerCount {
                joined: self.joined(),
                expected: workers,
            });
        }

        self.fabric.seal();
        info!(workers = workers; "starting training");

        let epochs = self.spec.epochs.get();
        let mut elapsed = Duration::ZERO;

        for epoch in 0..epochs {
            self.aggregate(epoch, elapsed).await?;

            let started = Instant::now();
            self.run_epoch(epoch).await?;
            elapsed += started.elapsed();
        }

        // Workers report once more after the final broadcast.
        self.aggregate(epochs, elapsed).await?;

        self.model.persist()?;
        self.fabric.shutdown().await;

        info!("training finished");
        Ok(())
    }

    async fn aggregate(&mut self, epoch: usize, elapsed: Duration) -> Result<()> {
        let total = aggregation::reduce(&mut self.inbox, self.spec.workers.get()).await?;
        let print = self.spec.should_print(epoch);
        aggregation::record(&mut self.stats, &total, elapsed, epoch, print);
        Ok(())
    }

    async fn run_epoch(&mut self, epoch: usize) -> Result<()> {
        self.updater.on_epoch_start();

        let learning_rate = self.schedule.rate(epoch);
        self.delays.reset();

        for iteration in 0..self.spec.iterations.get() {
            self.run_round(epoch, iteration, learning_rate).await?;
        }

        self.updater.on_epoch_end();
        Ok(())
    }

    async fn run_round(&mut self, epoch: usize, iteration: usize, learning_rate: f32) -> Result<()> {
        let last_iteration = iteration + 1 == self.spec.iterations.get();
        let mut round = Round::new(self.spec.workers.get(), last_iteration);

        while self.admission.keep_receiving(&round, &self.delays) {
            let (worker_id, grad) = self.inbox.next_gradient().await?;
            if !round.record(worker_id) {
                return Err(CoordinatorErr::DuplicateContribution {
                    worker_id,
                    epoch,
                    iteration,
                });
            }

            self.updater.apply_gradient(&mut self.model, &grad, learning_rate)?;
            self.delays.contribute(worker_id);
            debug!(worker_id = worker_id, epoch = epoch, iteration = iteration; "applied gradient");
        }

        if let Some(penalty) = self.spec.penalty() {
            let strength = learning_rate * penalty.lambda();
            self.updater.apply_regularizer(&mut self.model, penalty, strength);
        }

        let last_epoch = epoch + 1 == self.spec.epochs.get();
        let flags = ControlFlags::at(last_iteration, last_epoch);
        let frame = ModelFrame::encode(self.model.params(), flags);

        for worker_id in round.contributors() {
            self.fabric.send_model(worker_id, &frame).await?;
        }

        for worker_id in round.skipped() {
            self.delays.skip(worker_id);
        }

        debug!(
            epoch = epoch,
            iteration = iteration,
            contributors = round.count();
            "round closed"
        );

        Ok(())
    }
}

impl<M, U, W> ProtocolEngine for Coordinator<M, U, W>
where
    M: Model + Send,
    U: Updater<M> + Send,
    W: AsyncWrite + Unpin + Send,
{
    type Err = CoordinatorErr;

    async fn run(mut self) -> std::result::Result<TrainStatistics, Self::Err> {
        self.train().await?;
        Ok(self.stats)
    }
}
