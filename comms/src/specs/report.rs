use std::{iter::Sum, ops::Add};

/// One process' contribution to the epoch boundary reduction.
///
/// Loss and metric are carried as sums over the contributor's examples so that
/// summing reports and dividing by the summed example count yields global means.
/// Times are in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerReport {
    pub examples: f64,
    pub metric_sum: f64,
    pub loss_sum: f64,
    pub working_time: f64,
    pub waiting_time: f64,
}

impl WorkerReport {
    /// The amount of values a report carries on the wire.
    pub const FIELDS: usize = 5;

    /// The report as its wire values, in field declaration order.
    pub fn to_values(&self) -> [f64; Self::FIELDS] {
        [
            self.examples,
            self.metric_sum,
            self.loss_sum,
            self.working_time,
            self.waiting_time,
        ]
    }

    /// Rebuilds a report from the values written by `to_values`.
    pub fn from_values(values: [f64; Self::FIELDS]) -> Self {
        let [examples, metric_sum, loss_sum, working_time, waiting_time] = values;
        Self {
            examples,
            metric_sum,
            loss_sum,
            working_time,
            waiting_time,
        }
    }

    /// The global mean loss, zero when nobody contributed any example.
    pub fn mean_loss(&self) -> f64 {
        self.per_example(self.loss_sum)
    }

    /// The global mean evaluation metric, zero when nobody contributed any example.
    pub fn mean_metric(&self) -> f64 {
        self.per_example(self.metric_sum)
    }

    fn per_example(&self, sum: f64) -> f64 {
        if self.examples > 0. {
            sum / self.examples
        } else {
            0.
        }
    }
}

impl Add for WorkerReport {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            examples: self.examples + rhs.examples,
            metric_sum: self.metric_sum + rhs.metric_sum,
            loss_sum: self.loss_sum + rhs.loss_sum,
            working_time: self.working_time + rhs.working_time,
            waiting_time: self.waiting_time + rhs.waiting_time,
        }
    }
}

impl Sum for WorkerReport {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_field_by_field() {
        let a = WorkerReport {
            examples: 10.,
            metric_sum: 8.,
            loss_sum: 5.,
            working_time: 1.5,
            waiting_time: 0.5,
        };
        let b = WorkerReport {
            examples: 30.,
            metric_sum: 12.,
            loss_sum: 15.,
            working_time: 2.5,
            waiting_time: 1.0,
        };

        let total: WorkerReport = [WorkerReport::default(), a, b].into_iter().sum();
        assert_eq!(total.examples, 40.);
        assert_eq!(total.mean_loss(), 0.5);
        assert_eq!(total.mean_metric(), 0.5);
        assert_eq!(total.working_time, 4.);
        assert_eq!(total.waiting_time, 1.5);
    }

    #[test]
    fn empty_reduction_has_zero_means() {
        let total: WorkerReport = std::iter::empty().sum();
        assert_eq!(total.mean_loss(), 0.);
        assert_eq!(total.mean_metric(), 0.);
    }
}
