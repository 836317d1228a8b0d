use std::time::Duration;

/// A point of the loss curve of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossSample {
    /// Cumulative training time in seconds.
    pub time: f64,
    /// The mean loss at that time.
    pub loss: f64,
}

/// The statistics a process keeps about its own run.
///
/// Samples are appended once per epoch boundary and never rewritten.
#[derive(Debug, Clone, Default)]
pub struct TrainStatistics {
    samples: Vec<LossSample>,
    working_time: Duration,
    waiting_time: Duration,
}

impl TrainStatistics {
    /// Appends a new `(time, loss)` sample.
    pub fn track(&mut self, time: f64, loss: f64) {
        self.samples.push(LossSample { time, loss });
    }

    /// The loss curve, oldest first.
    pub fn samples(&self) -> &[LossSample] {
        &self.samples
    }

    /// The time of the latest sample, zero before the first one.
    pub fn last_time(&self) -> f64 {
        self.samples.last().map(|s| s.time).unwrap_or_default()
    }

    pub fn add_working_time(&mut self, elapsed: Duration) {
        self.working_time += elapsed;
    }

    pub fn add_waiting_time(&mut self, elapsed: Duration) {
        self.waiting_time += elapsed;
    }

    /// Overwrites both timing sums, used when they come from a global reduction.
    pub fn set_timing(&mut self, working_time: Duration, waiting_time: Duration) {
        self.working_time = working_time;
        self.waiting_time = waiting_time;
    }

    pub fn working_time(&self) -> Duration {
        self.working_time
    }

    pub fn waiting_time(&self) -> Duration {
        self.waiting_time
    }
}
