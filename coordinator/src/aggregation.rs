use std::time::Duration;

use comms::specs::WorkerReport;
use log::info;
use machine_learning::TrainStatistics;

use crate::{CoordinatorErr, Result, inbox::Inbox};

/// Runs the coordinator's half of an epoch boundary reduction.
///
/// The coordinator contributes zeros of its own and sums exactly one report per worker.
///
/// # Arguments
/// * `inbox` - Where the reports arrive.
/// * `workers` - The amount of workers of the run.
///
/// # Returns
/// The global sums.
pub(crate) async fn reduce(inbox: &mut Inbox, workers: usize) -> Result<WorkerReport> {
    let mut reported = vec![false; workers];
    let mut total = WorkerReport::default();

    for _ in 0..workers {
        let (worker_id, report) = inbox.next_report().await?;
        if reported[worker_id] {
            return Err(CoordinatorErr::DuplicateReport { worker_id });
        }

        reported[worker_id] = true;
        total = total + report;
    }

    Ok(total)
}

/// Turns a reduction into the next sample of the coordinator's statistics.
///
/// # Arguments
/// * `stats` - The coordinator's statistics.
/// * `total` - The global sums of the reduction.
/// * `elapsed` - Cumulative training time so far, reductions excluded.
/// * `epoch` - The epoch about to start, or the epoch count for the closing reduction.
/// * `print` - Whether to emit the epoch summary.
pub(crate) fn record(
    stats: &mut TrainStatistics,
    total: &WorkerReport,
    elapsed: Duration,
    epoch: usize,
    print: bool,
) {
    let time = elapsed.as_secs_f64();
    let loss = total.mean_loss();

    stats.track(time, loss);
    stats.set_timing(seconds(total.working_time), seconds(total.waiting_time));

    if print {
        info!(
            epoch = epoch,
            time = time,
            loss = loss,
            metric = total.mean_metric(),
            working_time = total.working_time,
            waiting_time = total.waiting_time;
            "epoch summary"
        );
    }
}

/// Reported times come from the workers, anything that isn't a valid duration counts as zero.
fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or_default()
}
