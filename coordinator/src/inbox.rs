use std::{collections::VecDeque, io};

use comms::specs::WorkerReport;
use log::{debug, error};
use tokio::sync::mpsc;

use crate::{CoordinatorErr, Result};

/// A message forwarded by a connection reader, tagged with its sender.
#[derive(Debug)]
pub(crate) enum Inbound {
    Gradient { worker_id: usize, grad: Vec<f32> },
    Report { worker_id: usize, report: WorkerReport },
    /// The worker said goodbye and closed its connection.
    Left { worker_id: usize },
    Unexpected { worker_id: usize, got: &'static str },
    Failed { worker_id: usize, err: io::Error },
}

/// Creates the queue every connection reader forwards into.
///
/// # Arguments
/// * `capacity` - How many inbound messages may be buffered before readers wait.
///
/// # Returns
/// The sending end to hand over to the readers and the `Inbox` draining it.
pub(crate) fn queue(capacity: usize) -> (mpsc::Sender<Inbound>, Inbox) {
    let (tx, rx) = mpsc::channel(capacity);
    let inbox = Inbox {
        rx,
        gradients: VecDeque::new(),
        reports: VecDeque::new(),
        departed: Vec::new(),
    };

    (tx, inbox)
}

/// The coordinator's receive-from-any endpoint.
///
/// Gradients and reports share every connection, whatever arrives while the
/// coordinator waits for the other purpose is deferred in arrival order.
pub(crate) struct Inbox {
    rx: mpsc::Receiver<Inbound>,
    gradients: VecDeque<(usize, Vec<f32>)>,
    reports: VecDeque<(usize, WorkerReport)>,
    departed: Vec<usize>,
}

impl Inbox {
    /// Waits for the next gradient from any worker.
    ///
    /// # Returns
    /// The sender's id and its gradient.
    pub async fn next_gradient(&mut self) -> Result<(usize, Vec<f32>)> {
        if let Some(&worker_id) = self.departed.first() {
            return Err(Self::left_early(worker_id));
        }

        if let Some(next) = self.gradients.pop_front() {
            return Ok(next);
        }

        loop {
            match self.next_inbound().await? {
                Inbound::Gradient { worker_id, grad } => return Ok((worker_id, grad)),
                Inbound::Report { worker_id, report } => {
                    debug!(worker_id = worker_id; "deferring early report");
                    self.reports.push_back((worker_id, report));
                }
                Inbound::Left { worker_id } => return Err(Self::left_early(worker_id)),
                Inbound::Unexpected { worker_id, got } => {
                    return Err(CoordinatorErr::UnexpectedMessage { worker_id, got });
                }
                Inbound::Failed { worker_id, err } => return Err(Self::transport(worker_id, err)),
            }
        }
    }

    /// Waits for the next epoch report from any worker.
    ///
    /// # Returns
    /// The sender's id and its report.
    pub async fn next_report(&mut self) -> Result<(usize, WorkerReport)> {
        if let Some(next) = self.reports.pop_front() {
            return Ok(next);
        }

        loop {
            match self.next_inbound().await? {
                Inbound::Report { worker_id, report } => return Ok((worker_id, report)),
                Inbound::Gradient { worker_id, grad } => {
                    debug!(worker_id = worker_id; "deferring early gradient");
                    self.gradients.push_back((worker_id, grad));
                }
                Inbound::Left { worker_id } => {
                    debug!(worker_id = worker_id; "worker left");
                    self.departed.push(worker_id);
                }
                Inbound::Unexpected { worker_id, got } => {
                    return Err(CoordinatorErr::UnexpectedMessage { worker_id, got });
                }
                Inbound::Failed { worker_id, err } => return Err(Self::transport(worker_id, err)),
            }
        }
    }

    async fn next_inbound(&mut self) -> Result<Inbound> {
        self.rx.recv().await.ok_or(CoordinatorErr::Disconnected)
    }

    /// A worker may only leave once no more rounds are expected from it.
    fn left_early(worker_id: usize) -> CoordinatorErr {
        CoordinatorErr::UnexpectedMessage {
            worker_id,
            got: "control/disconnect",
        }
    }

    fn transport(worker_id: usize, err: io::Error) -> CoordinatorErr {
        error!(worker_id = worker_id; "connection failed: {err}");
        CoordinatorErr::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(examples: f64) -> WorkerReport {
        WorkerReport {
            examples,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn reports_are_deferred_while_waiting_for_gradients() {
        let (tx, mut inbox) = queue(8);

        tx.send(Inbound::Report { worker_id: 1, report: report(3.) }).await.unwrap();
        tx.send(Inbound::Gradient { worker_id: 0, grad: vec![1.0] }).await.unwrap();
        tx.send(Inbound::Report { worker_id: 0, report: report(5.) }).await.unwrap();

        let (worker_id, grad) = inbox.next_gradient().await.unwrap();
        assert_eq!((worker_id, grad), (0, vec![1.0]));

        let (worker_id, got) = inbox.next_report().await.unwrap();
        assert_eq!((worker_id, got), (1, report(3.)));

        let (worker_id, got) = inbox.next_report().await.unwrap();
        assert_eq!((worker_id, got), (0, report(5.)));
    }

    #[tokio::test]
    async fn gradients_are_deferred_while_waiting_for_reports() {
        let (tx, mut inbox) = queue(8);

        tx.send(Inbound::Gradient { worker_id: 1, grad: vec![2.0] }).await.unwrap();
        tx.send(Inbound::Gradient { worker_id: 0, grad: vec![3.0] }).await.unwrap();
        tx.send(Inbound::Report { worker_id: 0, report: report(1.) }).await.unwrap();

        assert_eq!(inbox.next_report().await.unwrap().0, 0);
        assert_eq!(inbox.next_gradient().await.unwrap(), (1, vec![2.0]));
        assert_eq!(inbox.next_gradient().await.unwrap(), (0, vec![3.0]));
    }

    #[tokio::test]
    async fn leaving_mid_round_is_an_error() {
        let (tx, mut inbox) = queue(8);
        tx.send(Inbound::Left { worker_id: 2 }).await.unwrap();

        let err = inbox.next_gradient().await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorErr::UnexpectedMessage { worker_id: 2, .. }
        ));
    }

    #[tokio::test]
    async fn leaving_during_a_reduction_fails_the_next_round() {
        let (tx, mut inbox) = queue(8);
        tx.send(Inbound::Report { worker_id: 1, report: report(1.) }).await.unwrap();
        tx.send(Inbound::Left { worker_id: 1 }).await.unwrap();
        tx.send(Inbound::Report { worker_id: 0, report: report(1.) }).await.unwrap();

        assert_eq!(inbox.next_report().await.unwrap().0, 1);
        assert_eq!(inbox.next_report().await.unwrap().0, 0);

        let err = inbox.next_gradient().await.unwrap_err();
        assert!(matches!(
            err,
            CoordinatorErr::UnexpectedMessage { worker_id: 1, .. }
        ));
    }

    #[tokio::test]
    async fn closed_queue_is_a_disconnection() {
        let (tx, mut inbox) = queue(8);
        drop(tx);

        let err = inbox.next_report().await.unwrap_err();
        assert!(matches!(err, CoordinatorErr::Disconnected));
    }

    #[tokio::test]
    async fn transport_failure_is_propagated() {
        let (tx, mut inbox) = queue(8);
        let err = io::Error::from(io::ErrorKind::UnexpectedEof);
        tx.send(Inbound::Failed { worker_id: 0, err }).await.unwrap();

        let err = inbox.next_gradient().await.unwrap_err();
        let CoordinatorErr::Io(err) = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
