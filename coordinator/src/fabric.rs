use std::{borrow::Cow, io};

use comms::{
    MsgReceiver, MsgSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
    task::JoinSet,
};

use crate::{CoordinatorErr, Result, inbox::Inbound};

/// The coordinator's side of every worker connection.
///
/// Sending ends are kept here, indexed by worker id. Receiving ends are moved into
/// one reader task each, all of them forwarding into the same queue.
pub(crate) struct Fabric<W: AsyncWrite + Unpin> {
    senders: Vec<MsgSender<W>>,
    readers: JoinSet<()>,
    queue: Option<mpsc::Sender<Inbound>>,
    num_params: usize,
    capacity: usize,
}

impl<W: AsyncWrite + Unpin> Fabric<W> {
    /// Creates a new `Fabric`.
    ///
    /// # Arguments
    /// * `queue` - Where the readers forward inbound messages.
    /// * `num_params` - The model dimension every worker must agree on.
    /// * `capacity` - The amount of workers the run takes.
    pub fn new(queue: mpsc::Sender<Inbound>, num_params: usize, capacity: usize) -> Self {
        Self {
            senders: Vec::with_capacity(capacity),
            readers: JoinSet::new(),
            queue: Some(queue),
            num_params,
            capacity,
        }
    }

    /// The amount of workers admitted so far.
    pub fn joined(&self) -> usize {
        self.senders.len()
    }

    /// Stops admitting workers.
    ///
    /// Once sealed, the queue closes as soon as every reader is gone.
    pub fn seal(&mut self) {
        self.queue = None;
    }

    /// Waits for every worker to hang up, then closes the sending ends.
    ///
    /// Readers stop on a worker's `Disconnect` or on any failure of its connection.
    pub async fn shutdown(&mut self) {
        while let Some(res) = self.readers.join_next().await {
            if let Err(err) = res {
                warn!("reader task failed: {err}");
            }
        }

        self.senders.clear();
    }

    /// Sends a model message to a single worker.
    ///
    /// # Arguments
    /// * `worker_id` - The receiving worker.
    /// * `frame` - A `D + 2` long model message.
    pub async fn send_model(&mut self, worker_id: usize, frame: &[f32]) -> io::Result<()> {
        let msg = Msg::Data(Payload::Model(frame));
        self.senders[worker_id].send(&msg).await
    }

    /// Runs the join handshake with a freshly connected worker.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the connection.
    /// * `tx` - The sending end of the connection.
    ///
    /// # Returns
    /// The id assigned to the worker, ids follow the order in which workers join.
    pub async fn join<R>(&mut self, mut rx: MsgReceiver<R>, mut tx: MsgSender<W>) -> Result<usize>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let worker_id = self.joined();
        let mut buf: Vec<f32> = Vec::new();

        let msg: Msg = rx.recv_into(&mut buf).await?;
        let Msg::Control(Command::Join { num_params }) = msg else {
            return Err(CoordinatorErr::UnexpectedMessage {
                worker_id,
                got: msg.kind(),
            });
        };

        let queue = match self.queue.clone() {
            Some(queue) if num_params == self.num_params && worker_id < self.capacity => queue,
            _ => {
                let err = self.refusal(worker_id, num_params);
                warn!(worker_id = worker_id; "refusing worker: {err}");

                let msg = Msg::Err(Cow::Owned(err.to_string()));
                tx.send(&msg).await?;
                return Err(err);
            }
        };

        let msg = Msg::Control(Command::Welcome { worker_id });
        tx.send(&msg).await?;

        rx.limit_to_model(num_params);
        self.readers.spawn(read_loop(worker_id, rx, queue));
        self.senders.push(tx);

        info!(worker_id = worker_id, num_params = num_params; "worker joined");
        Ok(worker_id)
    }

    /// Explains why a worker can't join.
    fn refusal(&self, worker_id: usize, num_params: usize) -> CoordinatorErr {
        if num_params != self.num_params {
            CoordinatorErr::ConfigMismatch {
                worker_id,
                got: num_params,
                expected: self.num_params,
            }
        } else {
            CoordinatorErr::WorkerCount {
                joined: worker_id + 1,
                expected: self.capacity,
            }
        }
    }
}

/// Forwards every message of one connection into the shared queue.
///
/// Ends after a `Disconnect`, a transport failure or a message a worker must never send.
async fn read_loop<R>(worker_id: usize, mut rx: MsgReceiver<R>, queue: mpsc::Sender<Inbound>)
where
    R: AsyncRead + Unpin,
{
    let mut buf: Vec<f32> = Vec::new();

    loop {
        let inbound = match rx.recv_into(&mut buf).await {
            Ok(Msg::Data(Payload::Gradient(grad))) => Inbound::Gradient {
                worker_id,
                grad: grad.to_vec(),
            },
            Ok(Msg::Data(Payload::Report(report))) => Inbound::Report { worker_id, report },
            Ok(Msg::Control(Command::Disconnect)) => Inbound::Left { worker_id },
            Ok(Msg::Err(detail)) => Inbound::Failed {
                worker_id,
                err: io::Error::other(format!("worker aborted: {detail}")),
            },
            Ok(msg) => Inbound::Unexpected {
                worker_id,
                got: msg.kind(),
            },
            Err(err) => Inbound::Failed { worker_id, err },
        };

        let last = !matches!(
            inbound,
            Inbound::Gradient { .. } | Inbound::Report { .. }
        );

        if queue.send(inbound).await.is_err() || last {
            break;
        }
    }

    debug!(worker_id = worker_id; "reader finished");
}
