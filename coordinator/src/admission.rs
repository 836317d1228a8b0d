//! The bounded staleness bookkeeping of a round: who contributed, who lags, and
//! whether the round may close.

/// Rounds since each worker's last applied gradient.
#[derive(Debug, Clone)]
pub(crate) struct DelayCounters {
    delays: Vec<usize>,
}

impl DelayCounters {
    pub fn new(workers: usize) -> Self {
        Self {
            delays: vec![1; workers],
        }
    }

    /// Puts every counter back to 1, done at the start of each epoch.
    pub fn reset(&mut self) {
        self.delays.fill(1);
    }

    pub fn contribute(&mut self, worker_id: usize) {
        self.delays[worker_id] = 1;
    }

    pub fn skip(&mut self, worker_id: usize) {
        self.delays[worker_id] += 1;
    }

    pub fn get(&self, worker_id: usize) -> usize {
        self.delays[worker_id]
    }

    pub fn max(&self) -> usize {
        self.delays.iter().copied().max().unwrap_or(1)
    }
}

/// The contributors of a single round.
#[derive(Debug)]
pub(crate) struct Round {
    received: Vec<bool>,
    count: usize,
    last: bool,
}

impl Round {
    /// Creates an empty round.
    ///
    /// # Arguments
    /// * `workers` - The amount of workers of the run.
    /// * `last` - Whether this is the last round of the epoch.
    pub fn new(workers: usize, last: bool) -> Self {
        Self {
            received: vec![false; workers],
            count: 0,
            last,
        }
    }

    /// Marks `worker_id` as a contributor.
    ///
    /// # Returns
    /// `false` if the worker had already contributed to this round.
    pub fn record(&mut self, worker_id: usize) -> bool {
        if self.received[worker_id] {
            return false;
        }

        self.received[worker_id] = true;
        self.count += 1;
        true
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_last(&self) -> bool {
        self.last
    }

    /// The workers whose gradient was applied this round, they get the broadcast.
    pub fn contributors(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_status(true)
    }

    /// The workers left out of this round, their counters grow.
    pub fn skipped(&self) -> impl Iterator<Item = usize> + '_ {
        self.by_status(false)
    }

    fn by_status(&self, status: bool) -> impl Iterator<Item = usize> + '_ {
        self.received
            .iter()
            .enumerate()
            .filter(move |(_, received)| **received == status)
            .map(|(id, _)| id)
    }
}

/// The rule that decides when a round closes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Admission {
    workers: usize,
    group_size: usize,
    max_delay: usize,
}

impl Admission {
    /// Creates a new `Admission` policy.
    ///
    /// # Arguments
    /// * `workers` - The amount of workers of the run.
    /// * `group_size` - The minimum contributors of a non final round, already clamped
    ///                  to `workers` (see `TrainingSpec::effective_group_size`).
    /// * `max_delay` - The largest counter tolerated before waiting on the lagging worker.
    pub fn new(workers: usize, group_size: usize, max_delay: usize) -> Self {
        debug_assert!(group_size <= workers, "group size {group_size} above {workers} workers");

        Self {
            workers,
            group_size,
            max_delay,
        }
    }

    /// Whether the coordinator has to wait for another gradient before closing `round`.
    ///
    /// The last round of an epoch is a full barrier, any other round needs `group_size`
    /// contributors and no worker lagging more than `max_delay` rounds.
    pub fn keep_receiving(&self, round: &Round, delays: &DelayCounters) -> bool {
        if round.is_last() {
            return round.count() < self.workers;
        }

        round.count() < self.group_size || delays.max() > self.max_delay
    }
}
