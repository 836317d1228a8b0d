use std::borrow::Cow;

use comms::{
    ControlFlags, ModelFrame, MsgReceiver, MsgSender,
    msg::{Command, Msg, Payload},
    specs::WorkerReport,
};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Result, WorkerErr};

/// Coordinator client wrapper.
///
/// Contract:
/// - send gradients as `Msg::Data(Payload::Gradient)`
/// - receive the model and its flags as `Msg::Data(Payload::Model)`
/// - send epoch reports as `Msg::Data(Payload::Report)`
/// - the handshake travels as `Msg::Control`
pub struct CoordinatorClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: MsgReceiver<R>,
    tx: MsgSender<W>,
    buf: Vec<f32>,
}

impl<R, W> CoordinatorClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(rx: MsgReceiver<R>, tx: MsgSender<W>) -> Self {
        Self {
            rx,
            tx,
            buf: Vec::new(),
        }
    }

    /// Announces this worker's model dimension and waits to be admitted.
    ///
    /// # Returns
    /// The id the coordinator assigned, or `ConfigMismatch` if it refused.
    pub async fn join(&mut self, num_params: usize) -> Result<usize> {
        let msg = Msg::Control(Command::Join { num_params });
        self.tx.send(&msg).await?;

        let worker_id = match self.rx.recv_into(&mut self.buf).await? {
            Msg::Control(Command::Welcome { worker_id }) => worker_id,
            Msg::Err(detail) => {
                return Err(WorkerErr::ConfigMismatch {
                    detail: detail.into_owned(),
                });
            }
            other => {
                return Err(WorkerErr::UnexpectedMessage {
                    expected: "control/welcome",
                    got: other.kind(),
                });
            }
        };

        self.rx.limit_to_model(num_params);
        Ok(worker_id)
    }

    /// Sends a gradient, it must be `D` long.
    pub async fn send_gradient(&mut self, grad: &[f32]) -> Result<()> {
        let msg = Msg::Data(Payload::Gradient(grad));
        self.tx.send(&msg).await?;
        Ok(())
    }

    /// Receives the next model message, replacing the whole of `dst` with it.
    ///
    /// # Arguments
    /// * `dst` - The local replica, `D` long.
    ///
    /// # Returns
    /// The control flags piggybacked on the message.
    pub async fn recv_model_into(&mut self, dst: &mut [f32]) -> Result<ControlFlags> {
        match self.rx.recv_into(&mut self.buf).await? {
            Msg::Data(Payload::Model(raw)) => {
                let frame = ModelFrame::decode(raw, dst.len())?;
                dst.copy_from_slice(frame.params);
                Ok(frame.flags)
            }
            Msg::Err(detail) => Err(WorkerErr::Rejected {
                detail: detail.into_owned(),
            }),
            other => Err(WorkerErr::UnexpectedMessage {
                expected: "data/model",
                got: other.kind(),
            }),
        }
    }

    /// Sends this worker's contribution to an epoch boundary reduction.
    pub async fn send_report(&mut self, report: WorkerReport) -> Result<()> {
        let msg = Msg::Data(Payload::Report(report));
        self.tx.send(&msg).await?;
        Ok(())
    }

    /// Tells the coordinator this worker is done.
    pub async fn disconnect(&mut self) -> Result<()> {
        let msg = Msg::Control(Command::Disconnect);
        self.tx.send(&msg).await?;
        Ok(())
    }

    /// Reports a local failure to the coordinator before giving up.
    pub async fn abort(&mut self, detail: &str) -> Result<()> {
        let msg = Msg::Err(Cow::Borrowed(detail));
        self.tx.send(&msg).await?;
        Ok(())
    }
}
